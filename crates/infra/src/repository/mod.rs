//! Persistence boundary for return authorizations.
//!
//! The repository owns the authoritative uniqueness constraint on RA numbers
//! and the optimistic concurrency check on aggregate versions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryReturnAuthorizationRepository;
pub use r#trait::{NumberLookup, RepositoryError, ReturnAuthorizationRepository};
