//! Steering event queue
//!
//! Notable things that happen while steering (behavior changes, finished
//! blends, deadlock engagement) are reported as [`SteeringEvent`]s so hosts
//! can drive animation, audio or debug overlays without polling agent state.
//!
//! # Design Principles
//!
//! - **Type Safety**: All events are strongly typed via the `SteeringEvent` enum
//! - **Double Buffering**: Events are tick-consistent (no mid-tick mutations)
//! - **Simplicity**: No pub/sub, just push and iterate
//!
//! # Example
//!
//! ```ignore
//! // After a batch tick
//! events.swap();
//! for AgentEvent { agent, event } in events.iter() {
//!     if let SteeringEvent::BehaviorChanged { to, .. } = event {
//!         play_bark(*agent, to);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorId;
use crate::steering::TurnSide;

// ============================================================================
// Event Types
// ============================================================================

/// Something that happened to one agent this tick.
///
/// # Extensibility
///
/// The `#[non_exhaustive]` attribute allows adding new variants without
/// breaking downstream code that uses wildcard patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SteeringEvent {
    /// The active behavior changed.
    BehaviorChanged {
        /// Behavior left
        from: BehaviorId,
        /// Behavior entered
        to: BehaviorId,
        /// Forced by the host rather than a rule
        manual: bool,
    },

    /// A blend finished; only the current behavior is evaluated from now on.
    BlendCompleted {
        /// Behavior that was blended out
        source: BehaviorId,
    },

    /// The goal slot became blocked and a side was chosen.
    DeadlockEngaged {
        /// Side the agent is biased toward
        side: TurnSide,
    },

    /// The goal slot cleared and the persisted side was dropped.
    DeadlockCleared,

    /// The agent reached a waypoint.
    WaypointReached {
        /// Waypoint index
        index: usize,
    },

    /// The agent reached the last waypoint.
    PathFinished,
}

/// A [`SteeringEvent`] tagged with the agent it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Index of the agent in the batch
    pub agent: usize,
    /// What happened
    pub event: SteeringEvent,
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for tick-consistent event processing.
///
/// Events pushed during tick N are available for reading during tick N+1.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<AgentEvent>,
    /// Events from the previous tick, ready for processing
    processing: VecDeque<AgentEvent>,
}

impl EventQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next tick.
    #[inline]
    pub fn push(&mut self, agent: usize, event: SteeringEvent) {
        self.pending.push_back(AgentEvent { agent, event });
    }

    /// Push every event of one agent.
    pub fn extend(&mut self, agent: usize, events: impl IntoIterator<Item = SteeringEvent>) {
        self.pending
            .extend(events.into_iter().map(|event| AgentEvent { agent, event }));
    }

    /// Swap the pending and processing queues.
    ///
    /// After swapping `iter()` returns the previous tick's events and
    /// `push()` writes to the new pending queue.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous tick.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AgentEvent> {
        self.processing.iter()
    }

    /// Drain all events from the previous tick.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = AgentEvent> + '_ {
        self.processing.drain(..)
    }

    /// Check if there are any events to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Get the number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Get the number of events pending for next tick.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
