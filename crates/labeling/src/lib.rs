//! Human labeling tasks: category/key assignment, per-labeler results merged
//! into a single JSON record per task.

pub mod error;
pub mod palette;
pub mod schema;
pub mod storage;
pub mod store;
pub mod task;

pub use error::*;
pub use palette::*;
pub use schema::*;
pub use storage::*;
pub use store::*;
pub use task::*;
