//! Catalogue tables (`id`, unique `name`, `description`, timestamps) that
//! users reference: roles and statuses share everything but the table.

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use handlers::routes;
pub use repo::NamedRepo;
pub use repo_types::{LookupKey, Named, NamedKind, NamedPatch, NewNamed};
