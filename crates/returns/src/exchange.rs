//! Expedited exchanges: reimburse exchange items before the goods come back.
//!
//! Runs after every committed save of a return authorization when enabled:
//!
//! ```text
//! exchange-required items
//!   ↓ attempt_accept (failures swallowed)
//! accepted items ── none ──> stop
//!   ↓ pre-exchange hooks, in registration order
//! Reimbursement::for_items ── total overflows ──> abort, as for a failed save
//!   ↓ gateway.save ── fails ──> errors onto the authorization, abort the save
//! gateway.perform (outcome only logged)
//!   ↓
//! items marked exchange-processed
//! ```
//!
//! Marking the items processed after a successful save is what keeps a later
//! run from reimbursing them a second time.

use std::sync::Arc;

use tracing::{info, warn};

use rma_core::{AggregateRoot, Currency, Entity, OrderId, ReimbursementId, ReturnAuthorizationId, ReturnItemId};

use crate::authorization::ReturnAuthorization;
use crate::collaborators::{ReimbursementGateway, ReturnItem};
use crate::error::{BASE, ReturnsError, ReturnsResult, ValidationErrors, codes};
use crate::reimbursement::Reimbursement;

/// Extension point invoked with the accepted exchange items right before the
/// reimbursement is built.
pub trait PreExchangeHook<I>: Send + Sync {
    fn call(&self, items: &mut [&mut I]);
}

impl<I, F> PreExchangeHook<I> for F
where
    F: Fn(&mut [&mut I]) + Send + Sync,
{
    fn call(&self, items: &mut [&mut I]) {
        self(items)
    }
}

/// What a run of the orchestrator did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Expedited exchanges are switched off.
    Disabled,
    /// No exchange item reached the accepted state.
    NothingToExchange,
    Reimbursed {
        reimbursement_id: ReimbursementId,
        return_item_ids: Vec<ReturnItemId>,
    },
}

pub struct ExpeditedExchangeOrchestrator<I, G> {
    enabled: bool,
    hooks: Vec<Arc<dyn PreExchangeHook<I>>>,
    gateway: G,
}

impl<I, G> core::fmt::Debug for ExpeditedExchangeOrchestrator<I, G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExpeditedExchangeOrchestrator")
            .field("enabled", &self.enabled)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl<I, G> ExpeditedExchangeOrchestrator<I, G>
where
    I: ReturnItem,
    G: ReimbursementGateway,
{
    pub fn new(enabled: bool, hooks: Vec<Arc<dyn PreExchangeHook<I>>>, gateway: G) -> Self {
        Self {
            enabled,
            hooks,
            gateway,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Run the pipeline against a just-saved authorization.
    ///
    /// A reimbursement that fails to save is fatal: its errors are appended
    /// to the authorization's errors under `base` and
    /// [`ReturnsError::ReimbursementCreationFailed`] is returned so the caller
    /// can roll back the triggering save.
    pub fn run(&self, authorization: &mut ReturnAuthorization<I>) -> ReturnsResult<ExchangeOutcome> {
        if !self.enabled {
            return Ok(ExchangeOutcome::Disabled);
        }

        let authorization_id = *authorization.id();
        let order_id = authorization.order_id();
        let currency = authorization.currency();

        let result = self.process(
            authorization.return_items_mut(),
            authorization_id,
            order_id,
            currency,
        );

        match result {
            Ok(outcome) => Ok(outcome),
            Err(errors) => {
                warn!(
                    return_authorization_id = %authorization_id,
                    errors = %errors,
                    "expedited exchange reimbursement could not be saved"
                );
                for message in errors.full_messages() {
                    authorization.errors_mut().add(BASE, message);
                }
                Err(ReturnsError::ReimbursementCreationFailed(errors))
            }
        }
    }

    fn process(
        &self,
        items: &mut [I],
        authorization_id: ReturnAuthorizationId,
        order_id: Option<OrderId>,
        currency: Currency,
    ) -> Result<ExchangeOutcome, ValidationErrors> {
        let mut selected: Vec<&mut I> = items
            .iter_mut()
            .filter(|item| item.exchange_required())
            .collect();

        for item in selected.iter_mut() {
            if let Err(e) = item.attempt_accept() {
                warn!(
                    return_authorization_id = %authorization_id,
                    return_item_id = %item.id(),
                    error = %e,
                    "accept attempt failed for exchange item"
                );
            }
        }
        selected.retain(|item| item.is_accepted());

        if selected.is_empty() {
            return Ok(ExchangeOutcome::NothingToExchange);
        }

        for hook in &self.hooks {
            hook.call(&mut selected);
        }

        let Some(order_id) = order_id else {
            let mut errors = ValidationErrors::new();
            errors.add("order", codes::MUST_BE_PRESENT);
            return Err(errors);
        };

        let reimbursement = match Reimbursement::for_items(order_id, authorization_id, &selected, currency) {
            Ok(reimbursement) => reimbursement,
            Err(e) => {
                warn!(
                    return_authorization_id = %authorization_id,
                    error = %e,
                    "expedited exchange total cannot be represented"
                );
                let mut errors = ValidationErrors::new();
                errors.add("total", codes::AMOUNT_OVERFLOW);
                return Err(errors);
            }
        };
        self.gateway.save(&reimbursement)?;

        if let Err(e) = self.gateway.perform(&reimbursement) {
            warn!(
                return_authorization_id = %authorization_id,
                reimbursement_id = %reimbursement.id(),
                error = %e,
                "expedited exchange reimbursement failed to perform"
            );
        }

        for item in selected.iter_mut() {
            item.mark_exchange_processed();
        }

        info!(
            return_authorization_id = %authorization_id,
            reimbursement_id = %reimbursement.id(),
            items = selected.len(),
            "expedited exchange reimbursed"
        );

        Ok(ExchangeOutcome::Reimbursed {
            reimbursement_id: reimbursement.id(),
            return_item_ids: reimbursement.return_item_ids().to_vec(),
        })
    }
}
