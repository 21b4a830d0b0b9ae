//! Lifecycle events emitted by clinical services.
//!
//! - [`envelope`]: the event envelope written to the broker
//! - [`topic`]: topic names and single-segment wildcard patterns
//! - [`broadcaster`]: in-process fan-out used when no broker is configured

pub mod broadcaster;
pub mod envelope;
pub mod topic;

pub use broadcaster::{EventBroadcaster, PublishedEvent};
pub use envelope::{EVENT_TYPE_PREFIX, EventAction, EventEnvelope};
pub use topic::{PatternSegment, Topic, TopicPattern};
