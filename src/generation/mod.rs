pub mod adapter;
pub mod constraints;
pub mod repair;
pub mod seo;
pub mod types;

pub use adapter::{AdapterOptions, GenerationAdapter, Generator};
pub use seo::{AnalysisMode, SeoAnalyzer};
pub use types::{GenerationResult, SeoReport};
