//! Builds lfviz debug dumps: LF vote matrices, label-model probabilities and
//! nearest-neighbor rankings written as a manifest plus sibling JSON files.

pub mod artifacts;
pub mod dump;
pub mod error;
pub mod neighbors;
pub mod schema;
pub mod source;

pub use dump::*;
pub use error::*;
pub use neighbors::*;
pub use schema::*;
pub use source::*;
