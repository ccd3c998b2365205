use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use rma_core::{ExpectedVersion, ReturnAuthorizationId};
use rma_returns::{AuthorizationNumber, NumberIndex, ReturnAuthorization, ReturnItem};

/// Repository operation error.
///
/// Infrastructure errors (constraints, concurrency, storage) as opposed to
/// domain errors (validation, transitions).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Unique constraint on the RA number was violated.
    #[error("return authorization number {0} is already taken")]
    DuplicateNumber(AuthorizationNumber),

    #[error("return authorization {0} already exists")]
    AlreadyExists(ReturnAuthorizationId),

    #[error("return authorization must be numbered before it is stored")]
    MissingNumber,

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("return authorization {0} not found")]
    NotFound(ReturnAuthorizationId),

    #[error("repository lock poisoned")]
    Poisoned,
}

/// Storage for return authorizations together with their items.
///
/// Saves assign versions: `insert` stores version 1 and `update` stores the
/// previous version plus one, writing the new version back into the aggregate.
pub trait ReturnAuthorizationRepository<I: ReturnItem>: Send + Sync {
    /// Store a new, numbered authorization.
    fn insert(&self, authorization: &mut ReturnAuthorization<I>) -> Result<(), RepositoryError>;

    /// Store a changed authorization if the stored version matches `expected`.
    fn update(
        &self,
        authorization: &mut ReturnAuthorization<I>,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError>;

    /// Overwrite the stored record as-is, version included.
    ///
    /// Finishes or undoes a unit of work: writing the post-orchestration state
    /// under the version just committed, or putting back the snapshot taken
    /// before a failed save.
    fn replace(&self, authorization: &ReturnAuthorization<I>) -> Result<(), RepositoryError>;

    /// Remove an authorization and its items. Returns what was removed.
    fn delete(&self, id: ReturnAuthorizationId) -> Result<Option<ReturnAuthorization<I>>, RepositoryError>;

    fn get(&self, id: ReturnAuthorizationId) -> Result<Option<ReturnAuthorization<I>>, RepositoryError>;

    fn find_by_number(
        &self,
        number: &AuthorizationNumber,
    ) -> Result<Option<ReturnAuthorization<I>>, RepositoryError>;

    fn number_taken(&self, number: &AuthorizationNumber) -> Result<bool, RepositoryError>;
}

impl<I, R> ReturnAuthorizationRepository<I> for Arc<R>
where
    I: ReturnItem,
    R: ReturnAuthorizationRepository<I> + ?Sized,
{
    fn insert(&self, authorization: &mut ReturnAuthorization<I>) -> Result<(), RepositoryError> {
        (**self).insert(authorization)
    }

    fn update(
        &self,
        authorization: &mut ReturnAuthorization<I>,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        (**self).update(authorization, expected)
    }

    fn replace(&self, authorization: &ReturnAuthorization<I>) -> Result<(), RepositoryError> {
        (**self).replace(authorization)
    }

    fn delete(&self, id: ReturnAuthorizationId) -> Result<Option<ReturnAuthorization<I>>, RepositoryError> {
        (**self).delete(id)
    }

    fn get(&self, id: ReturnAuthorizationId) -> Result<Option<ReturnAuthorization<I>>, RepositoryError> {
        (**self).get(id)
    }

    fn find_by_number(
        &self,
        number: &AuthorizationNumber,
    ) -> Result<Option<ReturnAuthorization<I>>, RepositoryError> {
        (**self).find_by_number(number)
    }

    fn number_taken(&self, number: &AuthorizationNumber) -> Result<bool, RepositoryError> {
        (**self).number_taken(number)
    }
}

/// Exposes a repository's assigned numbers to the number generator.
pub struct NumberLookup<'a, R, I> {
    repository: &'a R,
    _item: PhantomData<fn() -> I>,
}

impl<'a, R, I> NumberLookup<'a, R, I> {
    pub fn new(repository: &'a R) -> Self {
        Self {
            repository,
            _item: PhantomData,
        }
    }
}

impl<R, I> NumberIndex for NumberLookup<'_, R, I>
where
    I: ReturnItem,
    R: ReturnAuthorizationRepository<I>,
{
    type Error = RepositoryError;

    fn contains(&self, number: &AuthorizationNumber) -> Result<bool, RepositoryError> {
        self.repository.number_taken(number)
    }
}
