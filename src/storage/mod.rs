//! Everything the batch reads from or writes to disk.

pub mod artifacts;
pub mod input;
pub mod ledger;

pub use artifacts::{ArtifactPaths, OutputLayout, write_json_atomic};
pub use input::{WorkItem, read_work_items};
pub use ledger::{Ledger, LedgerRow, LedgerStats, LedgerStatus};
