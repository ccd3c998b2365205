use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rma_core::{
    AggregateRoot, Entity, OrderId, ReimbursementId, ReturnAuthorizationId, ReturnItemId, StockLocationId,
};
use rma_events::Event;

use crate::authorization::{ReturnAuthorization, ReturnAuthorizationState};
use crate::collaborators::ReturnItem;
use crate::number::AuthorizationNumber;

/// Aggregate type used on published envelopes.
pub const AGGREGATE_TYPE: &str = "returns.authorization";

/// Event: ReturnAuthorized (first committed save).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnAuthorized {
    pub return_authorization_id: ReturnAuthorizationId,
    pub number: AuthorizationNumber,
    pub order_id: Option<OrderId>,
    pub stock_location_id: Option<StockLocationId>,
    pub return_item_ids: Vec<ReturnItemId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnAuthorizationUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnAuthorizationUpdated {
    pub return_authorization_id: ReturnAuthorizationId,
    pub state: ReturnAuthorizationState,
    pub return_item_ids: Vec<ReturnItemId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnAuthorizationCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnAuthorizationCanceled {
    pub return_authorization_id: ReturnAuthorizationId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpeditedExchangeReimbursed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditedExchangeReimbursed {
    pub return_authorization_id: ReturnAuthorizationId,
    pub reimbursement_id: ReimbursementId,
    pub return_item_ids: Vec<ReturnItemId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnAuthorizationEvent {
    Authorized(ReturnAuthorized),
    Updated(ReturnAuthorizationUpdated),
    Canceled(ReturnAuthorizationCanceled),
    ExchangeReimbursed(ExpeditedExchangeReimbursed),
}

impl ReturnAuthorizationEvent {
    /// `None` until the authorization has a number.
    pub fn authorized<I: ReturnItem>(
        authorization: &ReturnAuthorization<I>,
        occurred_at: DateTime<Utc>,
    ) -> Option<Self> {
        let number = authorization.number()?.clone();
        Some(Self::Authorized(ReturnAuthorized {
            return_authorization_id: *authorization.id(),
            number,
            order_id: authorization.order_id(),
            stock_location_id: authorization.stock_location_id(),
            return_item_ids: item_ids(authorization),
            occurred_at,
        }))
    }

    pub fn updated<I: ReturnItem>(authorization: &ReturnAuthorization<I>, occurred_at: DateTime<Utc>) -> Self {
        Self::Updated(ReturnAuthorizationUpdated {
            return_authorization_id: *authorization.id(),
            state: authorization.state(),
            return_item_ids: item_ids(authorization),
            occurred_at,
        })
    }

    pub fn canceled(return_authorization_id: ReturnAuthorizationId, occurred_at: DateTime<Utc>) -> Self {
        Self::Canceled(ReturnAuthorizationCanceled {
            return_authorization_id,
            occurred_at,
        })
    }

    pub fn exchange_reimbursed(
        return_authorization_id: ReturnAuthorizationId,
        reimbursement_id: ReimbursementId,
        return_item_ids: Vec<ReturnItemId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::ExchangeReimbursed(ExpeditedExchangeReimbursed {
            return_authorization_id,
            reimbursement_id,
            return_item_ids,
            occurred_at,
        })
    }

    pub fn return_authorization_id(&self) -> ReturnAuthorizationId {
        match self {
            ReturnAuthorizationEvent::Authorized(e) => e.return_authorization_id,
            ReturnAuthorizationEvent::Updated(e) => e.return_authorization_id,
            ReturnAuthorizationEvent::Canceled(e) => e.return_authorization_id,
            ReturnAuthorizationEvent::ExchangeReimbursed(e) => e.return_authorization_id,
        }
    }
}

fn item_ids<I: ReturnItem>(authorization: &ReturnAuthorization<I>) -> Vec<ReturnItemId> {
    authorization.return_items().iter().map(|item| *item.id()).collect()
}

impl Event for ReturnAuthorizationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReturnAuthorizationEvent::Authorized(_) => "returns.authorization.authorized",
            ReturnAuthorizationEvent::Updated(_) => "returns.authorization.updated",
            ReturnAuthorizationEvent::Canceled(_) => "returns.authorization.canceled",
            ReturnAuthorizationEvent::ExchangeReimbursed(_) => "returns.authorization.exchange_reimbursed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReturnAuthorizationEvent::Authorized(e) => e.occurred_at,
            ReturnAuthorizationEvent::Updated(e) => e.occurred_at,
            ReturnAuthorizationEvent::Canceled(e) => e.occurred_at,
            ReturnAuthorizationEvent::ExchangeReimbursed(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::StubReturnItem;

    #[test]
    fn authorized_requires_a_number() {
        let ra = ReturnAuthorization::<StubReturnItem>::new(ReturnAuthorizationId::new());
        assert!(ReturnAuthorizationEvent::authorized(&ra, Utc::now()).is_none());
    }

    #[test]
    fn updated_carries_state_and_items() {
        let item = StubReturnItem::new(10);
        let item_id = *item.id();
        let mut ra = ReturnAuthorization::new(ReturnAuthorizationId::new()).with_items([item]);
        ra.cancel().unwrap();

        let event = ReturnAuthorizationEvent::updated(&ra, Utc::now());

        assert_eq!(event.event_type(), "returns.authorization.updated");
        assert_eq!(event.return_authorization_id(), *ra.id());
        match event {
            ReturnAuthorizationEvent::Updated(e) => {
                assert_eq!(e.state, ReturnAuthorizationState::Canceled);
                assert_eq!(e.return_item_ids, vec![item_id]);
            }
            other => panic!("expected Updated, got {other:?}"),
        }
    }

    #[test]
    fn payload_serializes_state_in_snake_case() {
        let ra = ReturnAuthorization::<StubReturnItem>::new(ReturnAuthorizationId::new());
        let json = serde_json::to_value(ReturnAuthorizationEvent::updated(&ra, Utc::now())).unwrap();
        assert_eq!(json["Updated"]["state"], "authorized");
    }
}
