//! Save pipeline for return authorizations.
//!
//! ```text
//! create / update
//!   ↓
//! 1. Validate (eligibility checks on create only)
//!   ↓
//! 2. Assign a unique number (create only, bounded retry)
//!   ↓
//! 3. Persist (insert → version 1, update → expected version + 1)
//!   ↓
//! 4. Expedited exchange orchestration
//!      ok   → write the post-orchestration state under the same version
//!      fail → undo step 3 (delete on create, restore snapshot on update)
//!   ↓
//! 5. Publish events (after commit; failures are logged, not returned)
//! ```
//!
//! Steps 3 and 4 form one unit of work: a reimbursement that cannot be saved
//! leaves no trace of the save that triggered it.

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use rma_core::{AggregateRoot, Currency, DomainError, DomainResult, ExpectedVersion, ReturnAuthorizationId};
use rma_events::{EventBus, EventEnvelope};
use rma_returns::{
    AGGREGATE_TYPE, AuthorizationNumber, EligibilityValidator, ExchangeOutcome, ExpeditedExchangeOrchestrator,
    NumberGenerator, PreExchangeHook, ReimbursementGateway, ReturnAuthorization, ReturnAuthorizationEvent,
    ReturnItem, ReturnsError, ValidationContext, ValidationErrors,
};

use crate::config::ReturnsConfig;
use crate::repository::{NumberLookup, RepositoryError, ReturnAuthorizationRepository};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The authorization failed validation; nothing was persisted. The same
    /// errors are recorded on the aggregate.
    #[error("return authorization is invalid: {0}")]
    Validation(ValidationErrors),

    /// Another authorization took the number first. Safe to retry the create.
    #[error("return authorization number {0} is already taken")]
    DuplicateNumber(AuthorizationNumber),

    /// Stale version. Reload and retry.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    #[error("return authorization {0} not found")]
    NotFound(ReturnAuthorizationId),

    #[error(transparent)]
    Returns(ReturnsError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl ServiceError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::DuplicateNumber(_) | ServiceError::Concurrency(_))
    }
}

impl From<ReturnsError> for ServiceError {
    fn from(value: ReturnsError) -> Self {
        match value {
            ReturnsError::Validation(errors) => ServiceError::Validation(errors),
            other => ServiceError::Returns(other),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::DuplicateNumber(number) => ServiceError::DuplicateNumber(number),
            RepositoryError::Concurrency(msg) => ServiceError::Concurrency(msg),
            RepositoryError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Repository(other),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        ServiceError::Returns(ReturnsError::Domain(value))
    }
}

/// Which kind of save is running; decides validation and compensation.
enum Save<I> {
    Create,
    Update { snapshot: ReturnAuthorization<I> },
}

/// Application service over the return authorization aggregate.
///
/// - `R`: storage (`ReturnAuthorizationRepository`)
/// - `G`: reimbursement gateway used by expedited exchanges
/// - `B`: bus receiving committed events
#[derive(Debug)]
pub struct ReturnAuthorizationService<I, R, G, B> {
    repository: R,
    orchestrator: ExpeditedExchangeOrchestrator<I, G>,
    bus: B,
    numbers: NumberGenerator,
    validator: EligibilityValidator,
    default_currency: Currency,
}

impl<I, R, G, B> ReturnAuthorizationService<I, R, G, B>
where
    I: ReturnItem,
    R: ReturnAuthorizationRepository<I>,
    G: ReimbursementGateway,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        config: &ReturnsConfig,
        repository: R,
        gateway: G,
        hooks: Vec<std::sync::Arc<dyn PreExchangeHook<I>>>,
        bus: B,
    ) -> Self {
        Self {
            repository,
            orchestrator: ExpeditedExchangeOrchestrator::new(config.expedited_exchanges, hooks, gateway),
            bus,
            numbers: config.number_generator(),
            validator: EligibilityValidator,
            default_currency: config.default_currency.clone(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn gateway(&self) -> &G {
        self.orchestrator.gateway()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Create a new authorization.
    ///
    /// On success the aggregate carries its number and version 1. On failure
    /// nothing is stored and the aggregate's errors say why.
    pub fn create(&self, authorization: &mut ReturnAuthorization<I>) -> Result<(), ServiceError> {
        if authorization.is_persisted() {
            return Err(DomainError::invariant("return authorization is already persisted").into());
        }
        authorization.set_fallback_currency(self.default_currency.clone());

        self.validator.validate(authorization, ValidationContext::Create)?;
        self.numbers
            .assign(authorization, &NumberLookup::<R, I>::new(&self.repository))?;

        if let Err(e) = self.repository.insert(authorization) {
            if let RepositoryError::DuplicateNumber(number) = &e {
                warn!(
                    return_authorization_id = %authorization.id(),
                    number = %number,
                    "return authorization number taken concurrently"
                );
                authorization.discard_unsaved_number();
            }
            return Err(e.into());
        }

        let outcome = self.orchestrate(authorization, Save::Create)?;

        info!(
            return_authorization_id = %authorization.id(),
            number = ?authorization.number().map(AuthorizationNumber::as_str),
            items = authorization.return_items().len(),
            "return authorization created"
        );

        let now = Utc::now();
        if let Some(event) = ReturnAuthorizationEvent::authorized(authorization, now) {
            self.publish(authorization, &event);
        }
        self.publish_exchange(authorization, outcome);
        Ok(())
    }

    /// Save changes to a stored authorization.
    ///
    /// The stored version must still equal the aggregate's version.
    pub fn update(&self, authorization: &mut ReturnAuthorization<I>) -> Result<(), ServiceError> {
        self.save_changes(authorization)?;
        let event = ReturnAuthorizationEvent::updated(authorization, Utc::now());
        self.publish(authorization, &event);
        Ok(())
    }

    /// Load, change, and save an authorization.
    pub fn modify(
        &self,
        id: ReturnAuthorizationId,
        change: impl FnOnce(&mut ReturnAuthorization<I>) -> DomainResult<()>,
    ) -> Result<ReturnAuthorization<I>, ServiceError> {
        let mut authorization = self.load(id)?;
        change(&mut authorization)?;
        self.update(&mut authorization)?;
        Ok(authorization)
    }

    /// Fire the cancel transition and save it.
    ///
    /// `Ok(false)` when the transition is rejected; nothing is saved then.
    pub fn cancel(&self, id: ReturnAuthorizationId) -> Result<bool, ServiceError> {
        let mut authorization = self.load(id)?;
        if !authorization.cancel()? {
            return Ok(false);
        }

        self.save_changes(&mut authorization)?;

        let event = ReturnAuthorizationEvent::canceled(id, Utc::now());
        self.publish(&authorization, &event);
        Ok(true)
    }

    /// Remove an authorization and its items.
    pub fn destroy(&self, id: ReturnAuthorizationId) -> Result<ReturnAuthorization<I>, ServiceError> {
        let removed = self.repository.delete(id)?.ok_or(ServiceError::NotFound(id))?;
        info!(return_authorization_id = %id, "return authorization destroyed");
        Ok(removed)
    }

    pub fn find(&self, id: ReturnAuthorizationId) -> Result<Option<ReturnAuthorization<I>>, ServiceError> {
        Ok(self.repository.get(id)?)
    }

    pub fn find_by_number(
        &self,
        number: &AuthorizationNumber,
    ) -> Result<Option<ReturnAuthorization<I>>, ServiceError> {
        Ok(self.repository.find_by_number(number)?)
    }

    fn load(&self, id: ReturnAuthorizationId) -> Result<ReturnAuthorization<I>, ServiceError> {
        self.repository.get(id)?.ok_or(ServiceError::NotFound(id))
    }

    fn save_changes(&self, authorization: &mut ReturnAuthorization<I>) -> Result<(), ServiceError> {
        let id = *authorization.id();
        if !authorization.is_persisted() {
            return Err(ServiceError::NotFound(id));
        }

        self.validator.validate(authorization, ValidationContext::Update)?;

        let snapshot = self.load(id)?;
        let expected = ExpectedVersion::Exact(authorization.version());
        self.repository.update(authorization, expected)?;

        let outcome = self.orchestrate(authorization, Save::Update { snapshot })?;

        debug!(
            return_authorization_id = %id,
            version = authorization.version(),
            state = %authorization.state(),
            "return authorization updated"
        );
        self.publish_exchange(authorization, outcome);
        Ok(())
    }

    /// Run expedited exchanges against a just-committed save, finishing or
    /// undoing the save depending on the result.
    fn orchestrate(
        &self,
        authorization: &mut ReturnAuthorization<I>,
        save: Save<I>,
    ) -> Result<ExchangeOutcome, ServiceError> {
        match self.orchestrator.run(authorization) {
            Ok(ExchangeOutcome::Disabled) => Ok(ExchangeOutcome::Disabled),
            Ok(outcome) => {
                self.repository.replace(authorization)?;
                Ok(outcome)
            }
            Err(e) => {
                self.compensate(authorization, save);
                Err(e.into())
            }
        }
    }

    fn compensate(&self, authorization: &mut ReturnAuthorization<I>, save: Save<I>) {
        let id = *authorization.id();
        let undone = match save {
            Save::Create => self.repository.delete(id).map(|_| 0),
            Save::Update { snapshot } => self.repository.replace(&snapshot).map(|_| snapshot.version()),
        };

        match undone {
            Ok(version) => {
                authorization.set_version(version);
                warn!(
                    return_authorization_id = %id,
                    restored_version = version,
                    "return authorization save rolled back"
                );
            }
            Err(e) => error!(
                return_authorization_id = %id,
                error = %e,
                "failed to roll back return authorization save"
            ),
        }
    }

    fn publish_exchange(&self, authorization: &ReturnAuthorization<I>, outcome: ExchangeOutcome) {
        if let ExchangeOutcome::Reimbursed {
            reimbursement_id,
            return_item_ids,
        } = outcome
        {
            let event = ReturnAuthorizationEvent::exchange_reimbursed(
                *authorization.id(),
                reimbursement_id,
                return_item_ids,
                Utc::now(),
            );
            self.publish(authorization, &event);
        }
    }

    /// The save is already committed, so a failed publish is only logged.
    fn publish(&self, authorization: &ReturnAuthorization<I>, event: &ReturnAuthorizationEvent) {
        let envelope = match EventEnvelope::from_typed(
            *authorization.id().as_uuid(),
            AGGREGATE_TYPE,
            authorization.version(),
            event,
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    return_authorization_id = %authorization.id(),
                    error = %e,
                    "failed to serialize return authorization event"
                );
                return;
            }
        };

        let event_type = envelope.event_type().to_string();
        if let Err(e) = self.bus.publish(envelope) {
            warn!(
                return_authorization_id = %authorization.id(),
                event_type = %event_type,
                error = ?e,
                "failed to publish return authorization event"
            );
        }
    }
}
