use crate::CircuitState;
use crate::Outcome;
use resilient_dispatcher_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`Dispatcher`](crate::Dispatcher) over the course of
/// one `request` call.
///
/// Unlike the teacher middlewares (one event enum per independently-stacked
/// layer), this dispatcher unifies retry, backoff, hedge and circuit-breaker
/// observability into a single event stream, since a single `request` call
/// interleaves all of them under one budget.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// An attempt is about to be issued against `endpoint_index`.
    AttemptStarted {
        pattern_name: String,
        timestamp: Instant,
        endpoint_index: usize,
        attempt: usize,
    },
    /// An attempt completed (successfully or not).
    AttemptCompleted {
        pattern_name: String,
        timestamp: Instant,
        endpoint_index: usize,
        attempt: usize,
        outcome: Outcome,
        duration: Duration,
    },
    /// A backoff wait is about to be taken before the next retry.
    BackoffWait {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// The primary attempt did not complete within the hedging delay, so
    /// sibling attempts were fanned out to the remaining endpoints.
    HedgeFanOut {
        pattern_name: String,
        timestamp: Instant,
        sibling_count: usize,
    },
    /// A circuit breaker transitioned state for one endpoint.
    CircuitStateTransition {
        pattern_name: String,
        timestamp: Instant,
        endpoint_index: usize,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// The `request` call returned [`Outcome::SUCCESS`].
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The `request` call was exhausted.
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
        reason: crate::ExhaustedReason,
    },
}

impl ResilienceEvent for DispatchEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::AttemptStarted { .. } => "AttemptStarted",
            DispatchEvent::AttemptCompleted { .. } => "AttemptCompleted",
            DispatchEvent::BackoffWait { .. } => "BackoffWait",
            DispatchEvent::HedgeFanOut { .. } => "HedgeFanOut",
            DispatchEvent::CircuitStateTransition { .. } => "CircuitStateTransition",
            DispatchEvent::Success { .. } => "Success",
            DispatchEvent::Exhausted { .. } => "Exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            DispatchEvent::AttemptStarted { timestamp, .. }
            | DispatchEvent::AttemptCompleted { timestamp, .. }
            | DispatchEvent::BackoffWait { timestamp, .. }
            | DispatchEvent::HedgeFanOut { timestamp, .. }
            | DispatchEvent::CircuitStateTransition { timestamp, .. }
            | DispatchEvent::Success { timestamp, .. }
            | DispatchEvent::Exhausted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            DispatchEvent::AttemptStarted { pattern_name, .. }
            | DispatchEvent::AttemptCompleted { pattern_name, .. }
            | DispatchEvent::BackoffWait { pattern_name, .. }
            | DispatchEvent::HedgeFanOut { pattern_name, .. }
            | DispatchEvent::CircuitStateTransition { pattern_name, .. }
            | DispatchEvent::Success { pattern_name, .. }
            | DispatchEvent::Exhausted { pattern_name, .. } => pattern_name,
        }
    }
}
