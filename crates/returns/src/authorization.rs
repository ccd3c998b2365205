use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rma_core::{
    AggregateRoot, Currency, CustomerReturnId, DomainResult, Entity, Money, OrderId,
    ReturnAuthorizationId, ReturnItemId, ReturnReasonId, StockLocationId,
};

use crate::collaborators::{InventoryUnit, Order, ReturnItem};
use crate::error::ValidationErrors;
use crate::number::AuthorizationNumber;

/// Return authorization lifecycle.
///
/// `Authorized` is the initial state; `Canceled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnAuthorizationState {
    Authorized,
    Canceled,
}

impl ReturnAuthorizationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnAuthorizationState::Authorized => "authorized",
            ReturnAuthorizationState::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReturnAuthorizationState::Canceled)
    }
}

impl core::fmt::Display for ReturnAuthorizationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: ReturnAuthorization.
///
/// Owns its return items; removing the authorization removes them too. The
/// order is shared, read-only state owned by the order subsystem.
#[derive(Debug, Clone)]
pub struct ReturnAuthorization<I> {
    id: ReturnAuthorizationId,
    number: Option<AuthorizationNumber>,
    state: ReturnAuthorizationState,
    memo: Option<String>,
    order: Option<Arc<dyn Order>>,
    stock_location_id: Option<StockLocationId>,
    reason_id: Option<ReturnReasonId>,
    return_items: Vec<I>,
    fallback_currency: Currency,
    errors: ValidationErrors,
    version: u64,
}

impl<I: ReturnItem> ReturnAuthorization<I> {
    /// A new, unsaved authorization in the `authorized` state.
    pub fn new(id: ReturnAuthorizationId) -> Self {
        Self {
            id,
            number: None,
            state: ReturnAuthorizationState::Authorized,
            memo: None,
            order: None,
            stock_location_id: None,
            reason_id: None,
            return_items: Vec::new(),
            fallback_currency: Currency::default(),
            errors: ValidationErrors::new(),
            version: 0,
        }
    }

    pub fn with_order(mut self, order: Arc<dyn Order>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_stock_location(mut self, stock_location_id: StockLocationId) -> Self {
        self.stock_location_id = Some(stock_location_id);
        self
    }

    pub fn with_reason(mut self, reason_id: ReturnReasonId) -> Self {
        self.reason_id = Some(reason_id);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = I>) -> Self {
        self.return_items.extend(items);
        self
    }

    /// Currency reported when no order is referenced.
    pub fn with_fallback_currency(mut self, currency: Currency) -> Self {
        self.fallback_currency = currency;
        self
    }

    pub fn set_fallback_currency(&mut self, currency: Currency) {
        self.fallback_currency = currency;
    }

    pub fn number(&self) -> Option<&AuthorizationNumber> {
        self.number.as_ref()
    }

    pub(crate) fn set_number(&mut self, number: AuthorizationNumber) {
        self.number = Some(number);
    }

    /// Drop a number that was assigned but never stored, so the next create
    /// draws a fresh one. No-op once persisted.
    pub fn discard_unsaved_number(&mut self) -> Option<AuthorizationNumber> {
        if self.is_persisted() {
            return None;
        }
        self.number.take()
    }

    pub fn state(&self) -> ReturnAuthorizationState {
        self.state
    }

    pub fn is_canceled(&self) -> bool {
        self.state == ReturnAuthorizationState::Canceled
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn set_memo(&mut self, memo: Option<String>) {
        self.memo = memo;
    }

    pub fn order(&self) -> Option<&Arc<dyn Order>> {
        self.order.as_ref()
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order.as_ref().map(|o| o.id())
    }

    pub fn set_order(&mut self, order: Option<Arc<dyn Order>>) {
        self.order = order;
    }

    pub fn stock_location_id(&self) -> Option<StockLocationId> {
        self.stock_location_id
    }

    pub fn set_stock_location(&mut self, stock_location_id: Option<StockLocationId>) {
        self.stock_location_id = stock_location_id;
    }

    pub fn reason_id(&self) -> Option<ReturnReasonId> {
        self.reason_id
    }

    pub fn set_reason(&mut self, reason_id: Option<ReturnReasonId>) {
        self.reason_id = reason_id;
    }

    pub fn return_items(&self) -> &[I] {
        &self.return_items
    }

    pub fn return_items_mut(&mut self) -> &mut [I] {
        &mut self.return_items
    }

    pub fn find_item(&self, item_id: ReturnItemId) -> Option<&I> {
        self.return_items.iter().find(|item| *item.id() == item_id)
    }

    pub fn add_item(&mut self, item: I) {
        self.return_items.push(item);
    }

    /// Remove (destroy) an item. Returns it if it was present.
    pub fn remove_item(&mut self, item_id: ReturnItemId) -> Option<I> {
        let idx = self.return_items.iter().position(|item| *item.id() == item_id)?;
        Some(self.return_items.remove(idx))
    }

    /// Inventory units covered by this authorization, in item order.
    pub fn inventory_units(&self) -> impl Iterator<Item = &InventoryUnit> {
        self.return_items.iter().map(|item| item.inventory_unit())
    }

    /// Distinct customer returns that received any of the items.
    pub fn customer_returns(&self) -> Vec<CustomerReturnId> {
        let mut ids: Vec<CustomerReturnId> = Vec::new();
        for id in self.return_items.iter().filter_map(|item| item.customer_return_id()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn has_customer_returned_items(&self) -> bool {
        self.return_items
            .iter()
            .any(|item| item.customer_return_id().is_some())
    }

    /// Sum of the items' pre-tax amounts, in [`Self::currency`].
    ///
    /// Fails with an invariant violation if the sum overflows.
    pub fn pre_tax_total(&self) -> DomainResult<Money> {
        let currency = self.currency();
        self.return_items
            .iter()
            .try_fold(Money::zero(currency.clone()), |total, item| {
                total.checked_add(&Money::new(item.pre_tax_amount(), currency.clone()))
            })
    }

    /// The order's currency, or the fallback currency when no order is set.
    pub fn currency(&self) -> Currency {
        match &self.order {
            Some(order) => order.currency(),
            None => self.fallback_currency.clone(),
        }
    }

    /// Amount the order can still refund: pre-tax item amount plus promotions.
    ///
    /// `Ok(None)` when no order is referenced.
    pub fn refundable_amount(&self) -> DomainResult<Option<Money>> {
        let Some(order) = self.order.as_ref() else {
            return Ok(None);
        };
        let currency = order.currency();
        Money::new(order.pre_tax_item_amount(), currency.clone())
            .checked_add(&Money::new(order.promo_total(), currency))
            .map(Some)
    }

    /// Guard of the `cancel` transition: every item is cancelable, or there
    /// are no items at all.
    pub fn can_cancel_return_items(&self) -> bool {
        self.return_items.iter().all(|item| item.can_cancel())
    }

    /// Whether `cancel` would currently be applied.
    pub fn can_cancel(&self) -> bool {
        self.state == ReturnAuthorizationState::Authorized && self.can_cancel_return_items()
    }

    /// Fire the `cancel` transition (`authorized → canceled`).
    ///
    /// Returns `Ok(false)` without touching anything when the transition is
    /// rejected. Cancelable items are canceled before the state changes; if an
    /// item refuses, the error is returned and the aggregate is left as it was.
    pub fn cancel(&mut self) -> DomainResult<bool> {
        if !self.can_cancel() {
            debug!(
                return_authorization_id = %self.id,
                state = %self.state,
                "cancel transition rejected"
            );
            return Ok(false);
        }

        let mut items = self.return_items.clone();
        for item in items.iter_mut().filter(|item| item.can_cancel()) {
            item.cancel()?;
        }

        self.return_items = items;
        self.state = ReturnAuthorizationState::Canceled;
        info!(
            return_authorization_id = %self.id,
            items = self.return_items.len(),
            "return authorization canceled"
        );
        Ok(true)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    /// Set by repositories when a save commits.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }
}

impl<I: ReturnItem> AggregateRoot for ReturnAuthorization<I> {
    type Id = ReturnAuthorizationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rma_core::DomainError;

    use crate::testing::{StubOrder, StubReturnItem};

    fn authorization() -> ReturnAuthorization<StubReturnItem> {
        ReturnAuthorization::new(ReturnAuthorizationId::new())
    }

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    #[test]
    fn new_authorization_starts_authorized_and_unsaved() {
        let ra = authorization();
        assert_eq!(ra.state(), ReturnAuthorizationState::Authorized);
        assert!(ra.number().is_none());
        assert!(!ra.is_persisted());
        assert_eq!(ra.version(), 0);
    }

    #[test]
    fn unsaved_number_can_be_discarded_but_a_stored_one_cannot() {
        let number: AuthorizationNumber = "RA123456789".parse().unwrap();

        let mut ra = authorization();
        ra.set_number(number.clone());
        assert_eq!(ra.discard_unsaved_number(), Some(number.clone()));
        assert!(ra.number().is_none());

        ra.set_number(number.clone());
        ra.set_version(1);
        assert_eq!(ra.discard_unsaved_number(), None);
        assert_eq!(ra.number(), Some(&number));
    }

    #[test]
    fn cancel_cascades_to_every_item_when_all_are_cancelable() {
        let mut ra = authorization().with_items([StubReturnItem::new(100), StubReturnItem::new(250)]);

        assert!(ra.cancel().unwrap());

        assert_eq!(ra.state(), ReturnAuthorizationState::Canceled);
        assert!(ra.return_items().iter().all(|item| item.is_canceled()));
    }

    #[test]
    fn cancel_is_rejected_when_any_item_cannot_be_canceled() {
        let blocked = StubReturnItem::new(100).not_cancelable();
        let mut ra = authorization().with_items([StubReturnItem::new(50), blocked]);
        let before = ra.return_items().to_vec();

        assert!(!ra.can_cancel_return_items());
        assert!(!ra.cancel().unwrap());

        assert_eq!(ra.state(), ReturnAuthorizationState::Authorized);
        assert_eq!(ra.return_items(), before.as_slice());
    }

    #[test]
    fn cancel_without_items_passes_vacuously() {
        let mut ra = authorization();
        assert!(ra.can_cancel_return_items());
        assert!(ra.cancel().unwrap());
        assert!(ra.is_canceled());
    }

    #[test]
    fn canceled_is_terminal() {
        let mut ra = authorization();
        assert!(ra.cancel().unwrap());
        assert!(!ra.can_cancel());
        assert!(!ra.cancel().unwrap());
        assert!(ra.state().is_terminal());
    }

    #[test]
    fn failing_item_cancel_leaves_aggregate_untouched() {
        let mut ra = authorization()
            .with_items([StubReturnItem::new(10), StubReturnItem::new(20).failing_cancel()]);

        assert!(ra.cancel().is_err());

        assert_eq!(ra.state(), ReturnAuthorizationState::Authorized);
        assert!(ra.return_items().iter().all(|item| !item.is_canceled()));
    }

    #[test]
    fn pre_tax_total_follows_item_changes() {
        let first = StubReturnItem::new(1_000);
        let first_id = *first.id();
        let mut ra = authorization()
            .with_order(Arc::new(StubOrder::shipped().with_currency(eur())))
            .with_items([first, StubReturnItem::new(500)]);
        assert_eq!(ra.pre_tax_total().unwrap(), Money::new(1_500, eur()));

        ra.add_item(StubReturnItem::new(250));
        assert_eq!(ra.pre_tax_total().unwrap().amount(), 1_750);

        let removed = ra.remove_item(first_id).unwrap();
        assert_eq!(*removed.id(), first_id);
        assert_eq!(ra.pre_tax_total().unwrap().amount(), 750);
        assert!(ra.remove_item(first_id).is_none());
    }

    #[test]
    fn currency_comes_from_order_or_fallback() {
        let ra = authorization();
        assert_eq!(ra.currency(), Currency::default());

        let ra = authorization().with_fallback_currency(Currency::new("GBP").unwrap());
        assert_eq!(ra.currency().code(), "GBP");

        let ra = authorization().with_order(Arc::new(StubOrder::shipped().with_currency(eur())));
        assert_eq!(ra.currency(), eur());
    }

    #[test]
    fn refundable_amount_projects_the_order() {
        assert!(authorization().refundable_amount().unwrap().is_none());

        let order = StubOrder::shipped().with_amounts(10_000, -1_500);
        let ra = authorization().with_order(Arc::new(order));
        assert_eq!(ra.refundable_amount().unwrap().unwrap().amount(), 8_500);
    }

    #[test]
    fn overflowing_sums_are_reported() {
        let ra = authorization().with_items([StubReturnItem::new(i64::MAX), StubReturnItem::new(1)]);
        match ra.pre_tax_total() {
            Err(DomainError::InvariantViolation(msg)) => assert!(msg.contains("overflow")),
            other => panic!("expected overflow, got {other:?}"),
        }

        let order = StubOrder::shipped().with_amounts(i64::MAX, 1);
        let ra = authorization().with_order(Arc::new(order));
        assert!(ra.refundable_amount().is_err());
    }

    #[test]
    fn customer_return_projection_is_distinct() {
        let received = CustomerReturnId::new();
        let ra = authorization().with_items([
            StubReturnItem::new(1).received_in(received),
            StubReturnItem::new(2).received_in(received),
            StubReturnItem::new(3),
        ]);

        assert!(ra.has_customer_returned_items());
        assert_eq!(ra.customer_returns(), vec![received]);
        assert_eq!(ra.inventory_units().count(), 3);

        assert!(!authorization().with_items([StubReturnItem::new(1)]).has_customer_returned_items());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of additions and removals the pre-tax
        /// total equals the sum over the items currently held.
        #[test]
        fn pre_tax_total_matches_contained_items(
            amounts in prop::collection::vec(0i64..1_000_000, 0..20),
            removals in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let mut ra = authorization();
            for amount in &amounts {
                ra.add_item(StubReturnItem::new(*amount));
            }
            for idx in removals {
                if ra.return_items().is_empty() {
                    break;
                }
                let id = *ra.return_items()[idx.index(ra.return_items().len())].id();
                ra.remove_item(id);
            }

            let expected: i64 = ra.return_items().iter().map(|i| i.pre_tax_amount()).sum();
            prop_assert_eq!(ra.pre_tax_total().unwrap().amount(), expected);
        }
    }
}
