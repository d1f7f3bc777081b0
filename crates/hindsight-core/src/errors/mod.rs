mod hindsight_error;
mod reify_error;
mod storage_error;

pub use hindsight_error::{HindsightError, HindsightResult};
pub use reify_error::ReifyError;
pub use storage_error::StorageError;
