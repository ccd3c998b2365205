//! `rma-core`: domain foundation building blocks for return authorizations.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    CustomerReturnId, InventoryUnitId, OrderId, ReimbursementId, ReturnAuthorizationId,
    ReturnItemId, ReturnReasonId, StockLocationId,
};
pub use money::{Currency, Money};
pub use value_object::ValueObject;
