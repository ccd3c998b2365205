//! Ports to the subsystems a return authorization depends on.
//!
//! Orders, return items and reimbursements are owned elsewhere; the returns
//! domain only needs the capabilities listed here. Amounts are in minor units
//! of the order's currency.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rma_core::{Currency, CustomerReturnId, DomainResult, Entity, InventoryUnitId, OrderId, ReturnItemId};

use crate::error::ValidationErrors;
use crate::reimbursement::Reimbursement;

/// Read-only view of the order a return authorization was issued against.
pub trait Order: core::fmt::Debug + Send + Sync {
    fn id(&self) -> OrderId;

    /// Whether at least one of the order's inventory units has shipped.
    fn has_shipped_units(&self) -> bool;

    /// Sum of the order's item amounts before tax.
    fn pre_tax_item_amount(&self) -> i64;

    /// Total of promotions applied to the order (usually negative).
    fn promo_total(&self) -> i64;

    fn currency(&self) -> Currency;
}

/// Snapshot of the inventory unit behind a return item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub id: InventoryUnitId,
    /// An exchange has already been requested for this unit.
    pub exchange_requested: bool,
}

/// One line of a return authorization.
pub trait ReturnItem: Entity<Id = ReturnItemId> + Clone + core::fmt::Debug + Send + Sync {
    fn can_cancel(&self) -> bool;

    fn cancel(&mut self) -> DomainResult<()>;

    /// The customer asked for a replacement that hasn't been issued yet.
    fn exchange_required(&self) -> bool;

    /// Try to move the item to the accepted state. May fail or leave the item
    /// in another state (rejected, manual intervention, ...).
    fn attempt_accept(&mut self) -> DomainResult<()>;

    fn is_accepted(&self) -> bool;

    fn pre_tax_amount(&self) -> i64;

    fn inventory_unit(&self) -> &InventoryUnit;

    /// Customer return that received this item, once it arrived.
    fn customer_return_id(&self) -> Option<CustomerReturnId>;

    /// Record that a reimbursement now covers the exchange; afterwards
    /// `exchange_required` must report `false`.
    fn mark_exchange_processed(&mut self);
}

/// Persists and executes reimbursements.
pub trait ReimbursementGateway: Send + Sync {
    /// Validate and persist. Field errors are reported back verbatim.
    fn save(&self, reimbursement: &Reimbursement) -> Result<(), ValidationErrors>;

    /// Execute a saved reimbursement (refunds, exchange shipments, ...).
    fn perform(&self, reimbursement: &Reimbursement) -> DomainResult<()>;
}

impl<G> ReimbursementGateway for Arc<G>
where
    G: ReimbursementGateway + ?Sized,
{
    fn save(&self, reimbursement: &Reimbursement) -> Result<(), ValidationErrors> {
        (**self).save(reimbursement)
    }

    fn perform(&self, reimbursement: &Reimbursement) -> DomainResult<()> {
        (**self).perform(reimbursement)
    }
}
