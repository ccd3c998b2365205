//! Infrastructure for return authorizations: storage, configuration and the
//! save pipeline that ties validation, numbering, persistence, expedited
//! exchanges and event publication together.

pub mod config;
pub mod repository;
pub mod service;

pub use config::ReturnsConfig;
pub use repository::{
    InMemoryReturnAuthorizationRepository, NumberLookup, RepositoryError, ReturnAuthorizationRepository,
};
pub use service::{ReturnAuthorizationService, ServiceError};
