//! Two-state extension point proxy
//!
//! A proxy starts `Pending`, recording every invocation into an ordered
//! buffer. Binding an implementation drains the buffer in original call
//! order, then the proxy stays `Bound` and forwards invocations directly.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Mutex;

/// A call recorded while the extension point had no implementation yet
type RecordedCall<E> = Box<dyn FnOnce(E) -> BoxFuture<'static, ()> + Send>;

enum ProxyState<E> {
    Pending(Vec<RecordedCall<E>>),
    Bound(E),
}

/// Buffering handle for a single extension point
///
/// `E` is the shared handle type of the capability, typically an
/// `Arc<dyn Trait>`. Handles are cloned per invocation, so `E` must be a
/// cheap shared handle rather than owned state.
pub struct ExtensionProxy<E> {
    point_id: &'static str,
    state: Mutex<ProxyState<E>>,
}

impl<E> ExtensionProxy<E>
where
    E: Clone + Send + 'static,
{
    pub(crate) fn new(point_id: &'static str) -> Self {
        Self {
            point_id,
            state: Mutex::new(ProxyState::Pending(Vec::new())),
        }
    }

    pub fn point_id(&self) -> &'static str {
        self.point_id
    }

    /// Whether an implementation has been attached yet
    pub fn is_bound(&self) -> bool {
        matches!(*self.state.lock().unwrap(), ProxyState::Bound(_))
    }

    /// Number of calls currently waiting for an implementation
    pub fn buffered_calls(&self) -> usize {
        match *self.state.lock().unwrap() {
            ProxyState::Pending(ref buffer) => buffer.len(),
            ProxyState::Bound(_) => 0,
        }
    }

    /// Invoke a method on the (eventual) implementation
    ///
    /// Runs immediately when the point is bound; otherwise the call is
    /// appended to the buffer and replayed when a provider attaches.
    pub async fn invoke<F, Fut>(&self, call: F)
    where
        F: FnOnce(E) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ready = {
            let mut state = self.state.lock().unwrap();
            match &mut *state {
                ProxyState::Bound(implementation) => Some((implementation.clone(), call)),
                ProxyState::Pending(buffer) => {
                    log::trace!(
                        "Buffering call {} on unbound extension point '{}'",
                        buffer.len() + 1,
                        self.point_id
                    );
                    buffer.push(Box::new(move |implementation| {
                        Box::pin(call(implementation))
                    }));
                    None
                }
            }
        };

        if let Some((implementation, call)) = ready {
            call(implementation).await;
        }
    }

    /// Attach the implementation, replaying any buffered calls in FIFO order
    ///
    /// Returns the number of replayed calls. Binding an already bound proxy
    /// replaces the implementation (last writer wins) with a logged warning;
    /// nothing is replayed in that case since the buffer was already drained.
    pub(crate) async fn bind(&self, implementation: E) -> usize {
        let replay = {
            let mut state = self.state.lock().unwrap();
            match std::mem::replace(&mut *state, ProxyState::Bound(implementation.clone())) {
                ProxyState::Pending(buffer) => buffer,
                ProxyState::Bound(_) => {
                    log::warn!(
                        "Extension point '{}' was already registered, previous implementation replaced",
                        self.point_id
                    );
                    Vec::new()
                }
            }
        };

        let replayed = replay.len();
        for call in replay {
            call(implementation.clone()).await;
        }
        replayed
    }
}

impl<E> std::fmt::Debug for ExtensionProxy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.state.lock().unwrap() {
            ProxyState::Pending(ref buffer) => format!("Pending({} buffered)", buffer.len()),
            ProxyState::Bound(_) => "Bound".to_string(),
        };
        write!(f, "ExtensionProxy({}, {})", self.point_id, state)
    }
}
