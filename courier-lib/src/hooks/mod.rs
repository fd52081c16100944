//! Subscribers that see every request right before it is sent.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::request::RequestConfig;

/// A function that may inspect and modify an outgoing request
pub type RequestHook = Arc<dyn Fn(&mut RequestConfig) + Send + Sync>;

struct Subscriber {
    hook: RequestHook,
    once: bool,
}

/// An ordered list of request hooks.
///
/// Hooks run synchronously, in subscription order, immediately before each
/// physical send, so they also see every redirect hop. Hooks registered with
/// [`EventHooks::once`] are removed before their first call.
#[derive(Clone, Default)]
pub struct EventHooks(Arc<Mutex<Vec<Subscriber>>>);

impl EventHooks {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `hook` before every request.
    pub fn on<F>(&self, hook: F)
    where
        F: Fn(&mut RequestConfig) + Send + Sync + 'static,
    {
        self.push(Arc::new(hook), false);
    }

    /// Run `hook` before the next request only.
    pub fn once<F>(&self, hook: F)
    where
        F: Fn(&mut RequestConfig) + Send + Sync + 'static,
    {
        self.push(Arc::new(hook), true);
    }

    fn push(&self, hook: RequestHook, once: bool) {
        self.subscribers().push(Subscriber { hook, once });
    }

    /// Number of registered hooks
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers().len()
    }

    /// Returns `true` if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers().is_empty()
    }

    /// Run all hooks on `request`.
    ///
    /// The hooks are called without holding the lock, so a hook may register
    /// further hooks. Those run from the next request on.
    pub(crate) fn emit(&self, request: &mut RequestConfig) {
        let hooks: Vec<RequestHook> = {
            let mut subscribers = self.subscribers();
            let hooks = subscribers.iter().map(|s| Arc::clone(&s.hook)).collect();
            subscribers.retain(|s| !s.once);
            hooks
        };

        for hook in hooks {
            hook(request);
        }
    }
}

impl fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("len", &self.len())
            .finish()
    }
}
