//! Return authorizations domain module.
//!
//! Business rules for authorizing customer returns: creation eligibility,
//! RA number assignment, the cancellation state machine and the expedited
//! exchange pipeline. Everything here is deterministic domain logic; orders,
//! return items and reimbursements are reached through the ports in
//! [`collaborators`], persistence lives in `rma-infra`.

pub mod authorization;
pub mod collaborators;
pub mod error;
pub mod event;
pub mod exchange;
pub mod number;
pub mod reimbursement;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use authorization::{ReturnAuthorization, ReturnAuthorizationState};
pub use collaborators::{InventoryUnit, Order, ReimbursementGateway, ReturnItem};
pub use error::{BASE, FieldError, ReturnsError, ReturnsResult, ValidationErrors, codes};
pub use event::{
    AGGREGATE_TYPE, ExpeditedExchangeReimbursed, ReturnAuthorizationCanceled,
    ReturnAuthorizationEvent, ReturnAuthorizationUpdated, ReturnAuthorized,
};
pub use exchange::{ExchangeOutcome, ExpeditedExchangeOrchestrator, PreExchangeHook};
pub use number::{AuthorizationNumber, NumberGenerator, NumberIndex};
pub use reimbursement::Reimbursement;
pub use validation::{EligibilityValidator, ValidationContext};
