pub mod api;
pub mod classify;
pub mod cli;
pub mod coordinator;
pub mod error;
pub mod extraction;
pub mod output;
pub mod resolve;
pub mod types;

pub use api::{Extraction, SeriesExtractor};
pub use classify::{classify, Classification, SkipReason, SkippedFile};
pub use cli::report::TextReport;
pub use coordinator::{CancelToken, RunOptions};
pub use error::{MricatError, Result};
pub use extraction::HeaderCache;
pub use resolve::resolve;
pub use types::*;
