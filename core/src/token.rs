//! Cancellation handles for in-flight requests.

use std::fmt;
use std::sync::{Arc, Weak};

use uuid::Uuid;

/// An in-flight transport operation that can be cancelled.
///
/// Implementations must tolerate repeated calls.
pub trait Cancellable: Send + Sync {
    fn cancel(&self);
}

/// Lets a caller cancel a request without keeping its operation alive.
///
/// The token holds a weak reference: once the transport releases the
/// operation (normally right after delivering the result), `cancel` does
/// nothing. Cancelling after a result was produced never suppresses that
/// result.
#[derive(Clone)]
pub struct RequestToken {
    id: Uuid,
    operation: Weak<dyn Cancellable>,
}

impl RequestToken {
    pub fn new(id: Uuid, operation: &Arc<dyn Cancellable>) -> Self {
        Self {
            id,
            operation: Arc::downgrade(operation),
        }
    }

    /// Correlates this token with the dispatcher's log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the underlying operation is still held by its transport.
    pub fn is_alive(&self) -> bool {
        self.operation.strong_count() > 0
    }

    pub fn cancel(&self) {
        match self.operation.upgrade() {
            Some(operation) => {
                tracing::debug!(request_id = %self.id, "cancelling request");
                operation.cancel();
            }
            None => tracing::trace!(request_id = %self.id, "cancel on finished request ignored"),
        }
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct OperationSpy {
        cancels: AtomicUsize,
    }

    impl Cancellable for OperationSpy {
        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cancel_forwards_to_live_operation() {
        let spy = Arc::new(OperationSpy::default());
        let operation: Arc<dyn Cancellable> = spy.clone();
        let token = RequestToken::new(Uuid::new_v4(), &operation);

        token.cancel();
        assert_eq!(spy.cancels.load(Ordering::SeqCst), 1);
        assert!(token.is_alive());
    }

    #[test]
    fn cancel_after_release_is_noop() {
        let spy = Arc::new(OperationSpy::default());
        let operation: Arc<dyn Cancellable> = spy.clone();
        let token = RequestToken::new(Uuid::new_v4(), &operation);
        drop(operation);
        drop(spy);

        assert!(!token.is_alive());
        token.cancel();
        token.cancel();
    }

    #[test]
    fn token_does_not_keep_operation_alive() {
        let operation: Arc<dyn Cancellable> = Arc::new(OperationSpy::default());
        let token = RequestToken::new(Uuid::nil(), &operation);
        assert_eq!(Arc::strong_count(&operation), 1);
        assert_eq!(token.id(), Uuid::nil());
    }
}
