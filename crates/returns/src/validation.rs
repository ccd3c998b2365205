//! Save-time validation of return authorizations.
//!
//! Presence of the order and stock location is checked on every save. The
//! eligibility checks (shipped units, pending exchanges) only run when the
//! authorization is created. All checks run; none short-circuits.

use tracing::debug;

use rma_core::AggregateRoot;

use crate::authorization::ReturnAuthorization;
use crate::collaborators::ReturnItem;
use crate::error::{BASE, ReturnsError, ReturnsResult, ValidationErrors, codes};

/// Which save is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityValidator;

impl EligibilityValidator {
    /// Run the checks for `context`, replacing the authorization's errors
    /// with the result.
    pub fn validate<I: ReturnItem>(
        &self,
        authorization: &mut ReturnAuthorization<I>,
        context: ValidationContext,
    ) -> ReturnsResult<()> {
        let mut errors = ValidationErrors::new();

        Self::check_presence(authorization, &mut errors);
        if context == ValidationContext::Create {
            Self::check_shipped_units(authorization, &mut errors);
            Self::check_pending_exchanges(authorization, &mut errors);
        }

        *authorization.errors_mut() = errors.clone();

        if errors.is_empty() {
            Ok(())
        } else {
            debug!(
                return_authorization_id = %authorization.id(),
                ?context,
                errors = %errors,
                "return authorization failed validation"
            );
            Err(ReturnsError::Validation(errors))
        }
    }

    fn check_presence<I: ReturnItem>(authorization: &ReturnAuthorization<I>, errors: &mut ValidationErrors) {
        if authorization.order().is_none() {
            errors.add("order", codes::MUST_BE_PRESENT);
        }
        if authorization.stock_location_id().is_none() {
            errors.add("stock_location", codes::MUST_BE_PRESENT);
        }
    }

    fn check_shipped_units<I: ReturnItem>(
        authorization: &ReturnAuthorization<I>,
        errors: &mut ValidationErrors,
    ) {
        let shipped = authorization
            .order()
            .is_some_and(|order| order.has_shipped_units());
        if !shipped {
            errors.add("order", codes::ORDER_MISSING_SHIPPED_UNITS);
        }
    }

    fn check_pending_exchanges<I: ReturnItem>(
        authorization: &ReturnAuthorization<I>,
        errors: &mut ValidationErrors,
    ) {
        if authorization.inventory_units().any(|unit| unit.exchange_requested) {
            errors.add(BASE, codes::ITEMS_ALREADY_AWAITING_EXCHANGE);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use rma_core::{ReturnAuthorizationId, StockLocationId};

    use crate::testing::{StubOrder, StubReturnItem};

    fn valid_authorization() -> ReturnAuthorization<StubReturnItem> {
        ReturnAuthorization::new(ReturnAuthorizationId::new())
            .with_order(Arc::new(StubOrder::shipped()))
            .with_stock_location(StockLocationId::new())
            .with_items([StubReturnItem::new(100)])
    }

    fn validation_errors(result: ReturnsResult<()>) -> ValidationErrors {
        match result {
            Err(ReturnsError::Validation(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn valid_authorization_passes_on_create() {
        let mut ra = valid_authorization();
        EligibilityValidator.validate(&mut ra, ValidationContext::Create).unwrap();
        assert!(ra.errors().is_empty());
    }

    #[test]
    fn order_without_shipped_units_is_rejected_on_create() {
        let mut ra = valid_authorization().with_order(Arc::new(StubOrder::unshipped()));

        let errors = validation_errors(EligibilityValidator.validate(&mut ra, ValidationContext::Create));

        assert_eq!(errors.on("order"), vec![codes::ORDER_MISSING_SHIPPED_UNITS]);
        assert_eq!(ra.errors(), &errors);
    }

    #[test]
    fn missing_order_reports_presence_and_shipped_units() {
        let mut ra = ReturnAuthorization::<StubReturnItem>::new(ReturnAuthorizationId::new())
            .with_stock_location(StockLocationId::new());

        let errors = validation_errors(EligibilityValidator.validate(&mut ra, ValidationContext::Create));

        assert!(errors.contains("order", codes::MUST_BE_PRESENT));
        assert!(errors.contains("order", codes::ORDER_MISSING_SHIPPED_UNITS));
    }

    #[test]
    fn items_awaiting_exchange_are_rejected_on_create() {
        let mut ra = valid_authorization();
        ra.add_item(StubReturnItem::new(40).with_exchange_already_requested());

        let errors = validation_errors(EligibilityValidator.validate(&mut ra, ValidationContext::Create));

        assert_eq!(errors.on(BASE), vec![codes::ITEMS_ALREADY_AWAITING_EXCHANGE]);
    }

    #[test]
    fn creation_checks_do_not_short_circuit() {
        let mut ra = ReturnAuthorization::new(ReturnAuthorizationId::new())
            .with_order(Arc::new(StubOrder::unshipped()))
            .with_stock_location(StockLocationId::new())
            .with_items([StubReturnItem::new(1).with_exchange_already_requested()]);

        let errors = validation_errors(EligibilityValidator.validate(&mut ra, ValidationContext::Create));

        assert_eq!(errors.len(), 2);
        assert!(errors.contains("order", codes::ORDER_MISSING_SHIPPED_UNITS));
        assert!(errors.contains(BASE, codes::ITEMS_ALREADY_AWAITING_EXCHANGE));
    }

    #[test]
    fn eligibility_checks_are_skipped_on_update() {
        let mut ra = valid_authorization().with_order(Arc::new(StubOrder::unshipped()));
        ra.add_item(StubReturnItem::new(40).with_exchange_already_requested());

        EligibilityValidator.validate(&mut ra, ValidationContext::Update).unwrap();
    }

    #[test]
    fn presence_is_checked_on_update() {
        let mut ra = valid_authorization();
        ra.set_stock_location(None);

        let errors = validation_errors(EligibilityValidator.validate(&mut ra, ValidationContext::Update));

        assert_eq!(errors.on("stock_location"), vec![codes::MUST_BE_PRESENT]);
    }

    #[test]
    fn passing_validation_clears_previous_errors() {
        let mut ra = valid_authorization();
        ra.errors_mut().add(BASE, "stale");

        EligibilityValidator.validate(&mut ra, ValidationContext::Update).unwrap();

        assert!(ra.errors().is_empty());
    }
}
