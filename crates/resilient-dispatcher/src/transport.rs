use crate::Outcome;
use futures::future::BoxFuture;

/// A pluggable sink for one logical payload against one endpoint.
///
/// `send` is asynchronous and may be abandoned before it resolves: when the
/// dispatcher gives up on an attempt (a per-attempt timeout elapses, or a
/// hedge sibling loses the race) it simply stops polling the returned
/// future, which drops it. Implementations that hold cancellable I/O
/// (sockets, in-flight HTTP requests) should treat `Drop` as the
/// cancellation signal, the same way `tokio::time::timeout` cancels a
/// future by dropping it.
///
/// Implementations must be safe to call concurrently on distinct payloads —
/// the dispatcher may invoke `send` on the same endpoint from several
/// concurrent `request` calls, and, during hedging, from within a single
/// `request` call too.
pub trait Transport<Payload>: Send + Sync + 'static {
    /// Submits `payload` and resolves to the resulting [`Outcome`].
    ///
    /// The returned future must be `'static`: implementations that need
    /// access to shared state should clone an `Arc` into the async block
    /// rather than borrowing `self`, the same way `tower::service_fn`
    /// closures do.
    fn send(&self, payload: Payload) -> BoxFuture<'static, Outcome>;
}

impl<Payload, F> Transport<Payload> for F
where
    F: Fn(Payload) -> BoxFuture<'static, Outcome> + Send + Sync + 'static,
    Payload: Send,
{
    fn send(&self, payload: Payload) -> BoxFuture<'static, Outcome> {
        (self)(payload)
    }
}
