use std::collections::HashMap;
use std::sync::RwLock;

use rma_core::{AggregateRoot, ExpectedVersion, ReturnAuthorizationId};
use rma_returns::{AuthorizationNumber, ReturnAuthorization, ReturnItem};

use super::r#trait::{RepositoryError, ReturnAuthorizationRepository};

#[derive(Debug)]
struct Tables<I> {
    records: HashMap<ReturnAuthorizationId, ReturnAuthorization<I>>,
    /// Unique index on the RA number.
    numbers: HashMap<AuthorizationNumber, ReturnAuthorizationId>,
}

/// In-memory return authorization store.
///
/// Intended for tests/dev. Enforces the same constraints a relational store
/// would: unique ids, unique numbers, version checks on update.
#[derive(Debug)]
pub struct InMemoryReturnAuthorizationRepository<I> {
    tables: RwLock<Tables<I>>,
}

impl<I> InMemoryReturnAuthorizationRepository<I> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I> Default for InMemoryReturnAuthorizationRepository<I> {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables {
                records: HashMap::new(),
                numbers: HashMap::new(),
            }),
        }
    }
}

impl<I: ReturnItem> InMemoryReturnAuthorizationRepository<I> {
    pub fn len(&self) -> Result<usize, RepositoryError> {
        let tables = self.tables.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(tables.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }
}

impl<I: ReturnItem> ReturnAuthorizationRepository<I> for InMemoryReturnAuthorizationRepository<I> {
    fn insert(&self, authorization: &mut ReturnAuthorization<I>) -> Result<(), RepositoryError> {
        let number = authorization
            .number()
            .cloned()
            .ok_or(RepositoryError::MissingNumber)?;
        let id = *authorization.id();

        let mut tables = self.tables.write().map_err(|_| RepositoryError::Poisoned)?;

        if tables.records.contains_key(&id) {
            return Err(RepositoryError::AlreadyExists(id));
        }
        if tables.numbers.contains_key(&number) {
            return Err(RepositoryError::DuplicateNumber(number));
        }

        authorization.set_version(1);
        tables.numbers.insert(number, id);
        tables.records.insert(id, authorization.clone());
        Ok(())
    }

    fn update(
        &self,
        authorization: &mut ReturnAuthorization<I>,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        let id = *authorization.id();
        let mut tables = self.tables.write().map_err(|_| RepositoryError::Poisoned)?;

        let stored = tables.records.get(&id).ok_or(RepositoryError::NotFound(id))?;
        let current = stored.version();
        if !expected.matches(current) {
            return Err(RepositoryError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }
        if stored.number() != authorization.number() {
            return Err(RepositoryError::Concurrency(
                "return authorization number cannot change once stored".to_string(),
            ));
        }

        authorization.set_version(current + 1);
        tables.records.insert(id, authorization.clone());
        Ok(())
    }

    fn replace(&self, authorization: &ReturnAuthorization<I>) -> Result<(), RepositoryError> {
        let id = *authorization.id();
        let mut tables = self.tables.write().map_err(|_| RepositoryError::Poisoned)?;

        let stored = tables.records.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        *stored = authorization.clone();
        Ok(())
    }

    fn delete(&self, id: ReturnAuthorizationId) -> Result<Option<ReturnAuthorization<I>>, RepositoryError> {
        let mut tables = self.tables.write().map_err(|_| RepositoryError::Poisoned)?;

        let removed = tables.records.remove(&id);
        if let Some(number) = removed.as_ref().and_then(|ra| ra.number()) {
            tables.numbers.remove(number);
        }
        Ok(removed)
    }

    fn get(&self, id: ReturnAuthorizationId) -> Result<Option<ReturnAuthorization<I>>, RepositoryError> {
        let tables = self.tables.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(tables.records.get(&id).cloned())
    }

    fn find_by_number(
        &self,
        number: &AuthorizationNumber,
    ) -> Result<Option<ReturnAuthorization<I>>, RepositoryError> {
        let tables = self.tables.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(tables
            .numbers
            .get(number)
            .and_then(|id| tables.records.get(id))
            .cloned())
    }

    fn number_taken(&self, number: &AuthorizationNumber) -> Result<bool, RepositoryError> {
        let tables = self.tables.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(tables.numbers.contains_key(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rma_returns::NumberGenerator;
    use rma_returns::testing::StubReturnItem;

    use crate::repository::NumberLookup;

    type Repo = InMemoryReturnAuthorizationRepository<StubReturnItem>;

    fn numbered(repo: &Repo) -> ReturnAuthorization<StubReturnItem> {
        let mut ra = ReturnAuthorization::new(ReturnAuthorizationId::new());
        NumberGenerator::default()
            .assign(&mut ra, &NumberLookup::<_, StubReturnItem>::new(repo))
            .unwrap();
        ra
    }

    #[test]
    fn insert_assigns_version_one_and_indexes_number() {
        let repo = Repo::new();
        let mut ra = numbered(&repo);

        repo.insert(&mut ra).unwrap();

        assert_eq!(ra.version(), 1);
        let number = ra.number().unwrap();
        assert!(repo.number_taken(number).unwrap());
        let found = repo.find_by_number(number).unwrap().unwrap();
        assert_eq!(*found.id(), *ra.id());
    }

    #[test]
    fn insert_requires_a_number() {
        let repo = Repo::new();
        let mut ra = ReturnAuthorization::new(ReturnAuthorizationId::new());
        assert!(matches!(repo.insert(&mut ra), Err(RepositoryError::MissingNumber)));
        assert!(repo.is_empty().unwrap());
    }

    #[test]
    fn duplicate_numbers_violate_the_unique_constraint() {
        let repo = Repo::new();
        let generator = NumberGenerator::default();

        // Two writers that drew the same number from an empty index.
        let mut first = ReturnAuthorization::new(ReturnAuthorizationId::new());
        let mut second = ReturnAuthorization::new(ReturnAuthorizationId::new());
        generator
            .assign_with(&mut StdRng::seed_from_u64(7), &mut first, &NumberLookup::<_, StubReturnItem>::new(&repo))
            .unwrap();
        generator
            .assign_with(&mut StdRng::seed_from_u64(7), &mut second, &NumberLookup::<_, StubReturnItem>::new(&repo))
            .unwrap();
        assert_eq!(first.number(), second.number());

        repo.insert(&mut first).unwrap();
        match repo.insert(&mut second) {
            Err(RepositoryError::DuplicateNumber(number)) => assert_eq!(Some(&number), first.number()),
            other => panic!("expected DuplicateNumber, got {other:?}"),
        }
        assert_eq!(repo.len().unwrap(), 1);
        assert!(repo.get(*second.id()).unwrap().is_none());
    }

    #[test]
    fn inserting_the_same_id_twice_is_rejected() {
        let repo = Repo::new();
        let mut ra = numbered(&repo);
        repo.insert(&mut ra).unwrap();

        let mut again = ra.clone();
        match repo.insert(&mut again) {
            Err(RepositoryError::AlreadyExists(id)) => assert_eq!(id, *ra.id()),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn update_checks_the_expected_version() {
        let repo = Repo::new();
        let mut ra = numbered(&repo);
        repo.insert(&mut ra).unwrap();

        let mut stale = ra.clone();
        ra.set_memo(Some("first".to_string()));
        repo.update(&mut ra, ExpectedVersion::Exact(1)).unwrap();
        assert_eq!(ra.version(), 2);

        stale.set_memo(Some("second".to_string()));
        match repo.update(&mut stale, ExpectedVersion::Exact(1)) {
            Err(RepositoryError::Concurrency(msg)) => assert!(msg.contains("found 2")),
            other => panic!("expected Concurrency, got {other:?}"),
        }
        let stored = repo.get(*ra.id()).unwrap().unwrap();
        assert_eq!(stored.memo(), Some("first"));
    }

    #[test]
    fn replace_keeps_the_given_version() {
        let repo = Repo::new();
        let mut ra = numbered(&repo);
        repo.insert(&mut ra).unwrap();
        let snapshot = ra.clone();

        ra.set_memo(Some("changed".to_string()));
        repo.update(&mut ra, ExpectedVersion::Any).unwrap();
        repo.replace(&snapshot).unwrap();

        let stored = repo.get(*ra.id()).unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.memo(), None);
    }

    #[test]
    fn delete_releases_the_number() {
        let repo = Repo::new();
        let mut ra = numbered(&repo);
        repo.insert(&mut ra).unwrap();
        let number = ra.number().unwrap().clone();

        let removed = repo.delete(*ra.id()).unwrap().unwrap();

        assert_eq!(*removed.id(), *ra.id());
        assert!(!repo.number_taken(&number).unwrap());
        assert!(repo.get(*ra.id()).unwrap().is_none());
        assert!(repo.delete(*ra.id()).unwrap().is_none());
    }
}
