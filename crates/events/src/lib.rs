//! Domain events and their distribution.
//!
//! Events are facts emitted after a successful commit. The bus is for
//! distribution only; the repository stays the source of truth.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
