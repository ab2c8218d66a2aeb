pub mod emit;
pub mod engine;

pub use crate::domain::model::{CodeRecord, CodeRevision, CodeSet};
pub use crate::domain::ports::{Fetcher, Pipeline, Storage};
pub use crate::utils::error::Result;
