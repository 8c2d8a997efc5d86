//! Subscriptions and bindings.
//!
//! Every `on`/`subscribe` call returns a [`Subscription`]. Dropping a
//! subscription does NOT detach it; call [`Subscription::cancel`] or hand it to
//! a [`Bindings`] set that cancels everything at once.

/// Cleanup function returned by registries.
pub type Cleanup = Box<dyn FnOnce()>;

/// Handle to a registered listener.
#[must_use = "a subscription stays attached until cancelled"]
pub struct Subscription {
    cancel: Option<Cleanup>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Detach the listener.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the listener attached for the lifetime of its emitter.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Set of subscriptions a view holds on other emitters.
#[derive(Debug, Default)]
pub struct Bindings {
    subscriptions: Vec<Subscription>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Cancel and forget every binding.
    pub fn unbind_all(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
    }
}
