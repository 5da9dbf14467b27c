mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::{PostRepository, Repository, SoftDeletes};
pub use types::{Capability, Columns, Page};
