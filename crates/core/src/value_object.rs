//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are immutable: [`crate::Money`] with the
/// same amount and currency is the same money, whichever item it came from.
/// To "modify" one, build a new value.
///
/// The bounds keep them cheap to copy around, comparable by their attributes,
/// and printable in logs and test failures.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
