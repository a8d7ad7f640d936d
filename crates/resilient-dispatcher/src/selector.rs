use crate::health::EndpointHealth;
use std::sync::Arc;

/// Picks which endpoint a given attempt should be issued against.
///
/// Grounded in `original_source`'s `MultiClient`/`CircuitBreakerMultiClient`:
/// the plain variant just cycles through endpoints in construction order,
/// the health-ranked variant sorts by `(is_open, failure_rate,
/// time_until_recovery)` and picks the best.
///
/// `RoundRobin` carries no cursor of its own: the caller passes in the
/// attempt number as `cursor` on every [`select`](Self::select) call, so the
/// sequence is local to one `request` invocation (`spec.md` §4.4, §9) rather
/// than a counter shared — and contended — across concurrent calls.
pub enum EndpointSelector {
    /// Cycles through endpoints in construction order, one per call.
    RoundRobin,
    /// Ranks endpoints by [`EndpointHealth`] and picks the best: closed
    /// circuits before open ones, then lowest failure rate.
    HealthRanked { health: Vec<Arc<EndpointHealth>> },
}

impl EndpointSelector {
    /// A selector with no health tracking: attempts rotate through
    /// endpoints in order, wrapping around.
    pub fn round_robin() -> Self {
        EndpointSelector::RoundRobin
    }

    /// A selector backed by one [`EndpointHealth`] tracker per endpoint.
    /// `endpoint_count` must match the number of endpoints the
    /// [`Dispatcher`](crate::Dispatcher) was built with.
    pub fn health_ranked(
        endpoint_count: usize,
        window_size: usize,
        failure_threshold: f64,
        recovery_timeout: std::time::Duration,
    ) -> Self {
        let health = (0..endpoint_count)
            .map(|_| Arc::new(EndpointHealth::new(window_size, failure_threshold, recovery_timeout)))
            .collect();
        EndpointSelector::HealthRanked { health }
    }

    /// Returns the [`EndpointHealth`] tracker for `endpoint_index`, if this
    /// selector tracks health.
    pub fn health_of(&self, endpoint_index: usize) -> Option<&Arc<EndpointHealth>> {
        match self {
            EndpointSelector::RoundRobin => None,
            EndpointSelector::HealthRanked { health } => health.get(endpoint_index),
        }
    }

    /// Selects the endpoint index out of `endpoint_count` endpoints for the
    /// given `cursor` (the caller's local attempt number — `0` for the first
    /// attempt of a `request` call, `1` for the second, and so on).
    ///
    /// For [`EndpointSelector::HealthRanked`], also returns whether the
    /// chosen endpoint's circuit is open — the caller must treat that as
    /// "even the best possible endpoint is open" and give up, mirroring
    /// `CircuitBreakerMultiClient._make_request`.
    pub async fn select(&self, endpoint_count: usize, cursor: usize) -> (usize, bool) {
        match self {
            EndpointSelector::RoundRobin => {
                let index = cursor % endpoint_count;
                (index, false)
            }
            EndpointSelector::HealthRanked { health } => {
                let mut best: Option<(usize, bool, f64, std::time::Duration)> = None;
                for index in 0..endpoint_count {
                    let (is_open, failure_rate, recovery) = health[index].ranking_key().await;
                    let candidate = (index, is_open, failure_rate, recovery);
                    best = Some(match best {
                        None => candidate,
                        Some(current) => {
                            let current_key = (current.1, current.2, current.3);
                            let candidate_key = (candidate.1, candidate.2, candidate.3);
                            if candidate_key < current_key {
                                candidate
                            } else {
                                current
                            }
                        }
                    });
                }
                let (index, is_open, _, _) = best.expect("endpoint_count must be >= 1");
                (index, is_open)
            }
        }
    }
}
