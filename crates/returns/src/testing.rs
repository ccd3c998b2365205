//! Stub collaborators for tests.
//!
//! Enabled with the `testing` feature (always on for this crate's own tests).

use std::sync::Mutex;

use rma_core::{
    Currency, CustomerReturnId, DomainError, DomainResult, Entity, InventoryUnitId, OrderId,
    ReturnItemId,
};

use crate::collaborators::{InventoryUnit, Order, ReimbursementGateway, ReturnItem};
use crate::error::ValidationErrors;
use crate::reimbursement::Reimbursement;

#[derive(Debug, Clone)]
pub struct StubOrder {
    id: OrderId,
    shipped_units: bool,
    pre_tax_item_amount: i64,
    promo_total: i64,
    currency: Currency,
}

impl StubOrder {
    /// An order with at least one shipped unit.
    pub fn shipped() -> Self {
        Self {
            id: OrderId::new(),
            shipped_units: true,
            pre_tax_item_amount: 0,
            promo_total: 0,
            currency: Currency::default(),
        }
    }

    pub fn unshipped() -> Self {
        Self {
            shipped_units: false,
            ..Self::shipped()
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_amounts(mut self, pre_tax_item_amount: i64, promo_total: i64) -> Self {
        self.pre_tax_item_amount = pre_tax_item_amount;
        self.promo_total = promo_total;
        self
    }
}

impl Order for StubOrder {
    fn id(&self) -> OrderId {
        self.id
    }

    fn has_shipped_units(&self) -> bool {
        self.shipped_units
    }

    fn pre_tax_item_amount(&self) -> i64 {
        self.pre_tax_item_amount
    }

    fn promo_total(&self) -> i64 {
        self.promo_total
    }

    fn currency(&self) -> Currency {
        self.currency.clone()
    }
}

/// What `attempt_accept` does to a [`StubReturnItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accept,
    Reject,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubReturnItem {
    id: ReturnItemId,
    pre_tax_amount: i64,
    inventory_unit: InventoryUnit,
    customer_return_id: Option<CustomerReturnId>,
    cancelable: bool,
    cancel_fails: bool,
    canceled: bool,
    wants_exchange: bool,
    exchange_processed: bool,
    accept_outcome: AcceptOutcome,
    acceptance: Acceptance,
}

impl StubReturnItem {
    /// A plain, cancelable refund item.
    pub fn new(pre_tax_amount: i64) -> Self {
        Self {
            id: ReturnItemId::new(),
            pre_tax_amount,
            inventory_unit: InventoryUnit {
                id: InventoryUnitId::new(),
                exchange_requested: false,
            },
            customer_return_id: None,
            cancelable: true,
            cancel_fails: false,
            canceled: false,
            wants_exchange: false,
            exchange_processed: false,
            accept_outcome: AcceptOutcome::Accept,
            acceptance: Acceptance::Pending,
        }
    }

    /// An item the customer wants exchanged; accepts by default.
    pub fn exchange(pre_tax_amount: i64) -> Self {
        Self {
            wants_exchange: true,
            ..Self::new(pre_tax_amount)
        }
    }

    pub fn not_cancelable(mut self) -> Self {
        self.cancelable = false;
        self
    }

    pub fn failing_cancel(mut self) -> Self {
        self.cancel_fails = true;
        self
    }

    pub fn accepting(mut self, outcome: AcceptOutcome) -> Self {
        self.accept_outcome = outcome;
        self
    }

    /// The inventory unit already has an exchange in flight.
    pub fn with_exchange_already_requested(mut self) -> Self {
        self.inventory_unit.exchange_requested = true;
        self
    }

    pub fn received_in(mut self, customer_return_id: CustomerReturnId) -> Self {
        self.customer_return_id = Some(customer_return_id);
        self
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub fn acceptance(&self) -> Acceptance {
        self.acceptance
    }

    pub fn is_exchange_processed(&self) -> bool {
        self.exchange_processed
    }
}

impl Entity for StubReturnItem {
    type Id = ReturnItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ReturnItem for StubReturnItem {
    fn can_cancel(&self) -> bool {
        self.cancelable && !self.canceled
    }

    fn cancel(&mut self) -> DomainResult<()> {
        if self.cancel_fails {
            return Err(DomainError::invariant("return item refused to cancel"));
        }
        self.canceled = true;
        Ok(())
    }

    fn exchange_required(&self) -> bool {
        self.wants_exchange && !self.exchange_processed
    }

    fn attempt_accept(&mut self) -> DomainResult<()> {
        match self.accept_outcome {
            AcceptOutcome::Accept => {
                self.acceptance = Acceptance::Accepted;
                Ok(())
            }
            AcceptOutcome::Reject => {
                self.acceptance = Acceptance::Rejected;
                Ok(())
            }
            AcceptOutcome::Fail => Err(DomainError::validation("acceptance service unavailable")),
        }
    }

    fn is_accepted(&self) -> bool {
        self.acceptance == Acceptance::Accepted
    }

    fn pre_tax_amount(&self) -> i64 {
        self.pre_tax_amount
    }

    fn inventory_unit(&self) -> &InventoryUnit {
        &self.inventory_unit
    }

    fn customer_return_id(&self) -> Option<CustomerReturnId> {
        self.customer_return_id
    }

    fn mark_exchange_processed(&mut self) {
        self.exchange_processed = true;
    }
}

/// Gateway that records saved reimbursements and counts performs.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    saved: Mutex<Vec<Reimbursement>>,
    performed: Mutex<u32>,
    save_errors: Option<ValidationErrors>,
    perform_fails: bool,
}

impl RecordingGateway {
    /// Every save fails with `errors`.
    pub fn rejecting(errors: ValidationErrors) -> Self {
        Self {
            save_errors: Some(errors),
            ..Self::default()
        }
    }

    pub fn failing_perform(mut self) -> Self {
        self.perform_fails = true;
        self
    }

    pub fn saved(&self) -> Vec<Reimbursement> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn perform_count(&self) -> u32 {
        self.performed.lock().map(|p| *p).unwrap_or_default()
    }
}

impl ReimbursementGateway for RecordingGateway {
    fn save(&self, reimbursement: &Reimbursement) -> Result<(), ValidationErrors> {
        if let Some(errors) = &self.save_errors {
            return Err(errors.clone());
        }
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(reimbursement.clone());
        }
        Ok(())
    }

    fn perform(&self, _reimbursement: &Reimbursement) -> DomainResult<()> {
        if let Ok(mut performed) = self.performed.lock() {
            *performed += 1;
        }
        if self.perform_fails {
            return Err(DomainError::invariant("payment provider declined"));
        }
        Ok(())
    }
}
