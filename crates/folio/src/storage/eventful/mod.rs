//! Eventful repository decorators.
//!
//! These decorators wrap every mutating operation: the write runs first and,
//! only if it succeeds, a change event for the entity's namespace goes to the
//! [`ChangeNotifier`](crate::events::ChangeNotifier). Reads pass straight
//! through.

mod post;
mod repository;

pub use post::EventfulPostRepository;
pub use repository::EventfulRepository;
