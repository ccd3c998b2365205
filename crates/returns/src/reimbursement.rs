use serde::{Deserialize, Serialize};

use rma_core::{
    Currency, DomainResult, Entity, Money, OrderId, ReimbursementId, ReturnAuthorizationId, ReturnItemId,
};

use crate::collaborators::ReturnItem;

/// Reimbursement built by the expedited exchange pipeline.
///
/// The returns domain only constructs it; saving and performing go through a
/// [`crate::ReimbursementGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reimbursement {
    id: ReimbursementId,
    order_id: OrderId,
    return_authorization_id: ReturnAuthorizationId,
    return_item_ids: Vec<ReturnItemId>,
    total: Money,
}

impl Reimbursement {
    /// Fails with an invariant violation if the items' total overflows.
    pub fn for_items<I: ReturnItem>(
        order_id: OrderId,
        return_authorization_id: ReturnAuthorizationId,
        items: &[&mut I],
        currency: Currency,
    ) -> DomainResult<Self> {
        let total = items.iter().try_fold(Money::zero(currency.clone()), |total, item| {
            total.checked_add(&Money::new(item.pre_tax_amount(), currency.clone()))
        })?;

        Ok(Self {
            id: ReimbursementId::new(),
            order_id,
            return_authorization_id,
            return_item_ids: items.iter().map(|item| *item.id()).collect(),
            total,
        })
    }

    pub fn id(&self) -> ReimbursementId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn return_authorization_id(&self) -> ReturnAuthorizationId {
        self.return_authorization_id
    }

    pub fn return_item_ids(&self) -> &[ReturnItemId] {
        &self.return_item_ids
    }

    pub fn total(&self) -> &Money {
        &self.total
    }
}
