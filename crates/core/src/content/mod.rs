mod entity;
mod error;
mod types;

pub use entity::{attributes, fill, Attributes, Entity, EntityId};
pub use error::AttributeError;
pub use types::{Category, Post, PostStatus, Role, Tag};
