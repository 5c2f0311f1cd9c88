mod item;
mod state;

pub use item::{AttemptOutcome, ItemRun, ItemState, RetryConfig};
pub use state::{StateMachine, Transition};
