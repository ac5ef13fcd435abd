//! Key-path subscriptions over the state tree.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use log::error;
use serde_json::Value;

use crate::change;

/// Callback invoked with `(next, previous)` values of the watched path.
pub type Callback = Box<dyn FnMut(&Value, &Value)>;

/// Options accepted by [`SubscriptionRegistry::subscribe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Unregister after the first invocation.
    pub once: bool,
    /// Invoke synchronously with the current value at subscribe time.
    pub immediate: bool,
}

impl SubscribeOptions {
    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }
}

struct Listener {
    id: u64,
    once: bool,
    callback: RefCell<Callback>,
}

#[derive(Default)]
struct ListenerTable {
    by_path: IndexMap<String, Vec<Rc<Listener>>>,
    next_id: u64,
}

impl ListenerTable {
    fn remove(&mut self, path: &str, id: u64) -> bool {
        let Some(listeners) = self.by_path.get_mut(path) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.by_path.shift_remove(path);
        }
        removed
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener alive;
/// call [`Subscription::unsubscribe`] to remove it.
#[derive(Clone)]
pub struct Subscription {
    path: String,
    id: u64,
    table: Weak<RefCell<ListenerTable>>,
}

impl Subscription {
    /// Remove the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.table.upgrade() {
            Some(table) => table.borrow_mut().remove(&self.path, self.id),
            None => false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("id", &self.id)
            .finish()
    }
}

/// Listeners grouped by dotted key-path.
#[derive(Default)]
pub struct SubscriptionRegistry {
    table: Rc<RefCell<ListenerTable>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `path`.
    ///
    /// With `immediate`, the callback runs right away with the value of
    /// `path` in `current` and `null` as the previous value. An immediate
    /// one-shot subscription is therefore never stored.
    pub fn subscribe<F>(
        &self,
        path: impl Into<String>,
        options: SubscribeOptions,
        current: &Value,
        callback: F,
    ) -> Subscription
    where
        F: FnMut(&Value, &Value) + 'static,
    {
        let path = path.into();
        let mut table = self.table.borrow_mut();
        let id = table.next_id;
        table.next_id += 1;

        let listener = Rc::new(Listener {
            id,
            once: options.once,
            callback: RefCell::new(Box::new(callback)),
        });

        let subscription = Subscription {
            path: path.clone(),
            id,
            table: Rc::downgrade(&self.table),
        };

        if options.immediate {
            drop(table);
            invoke(&path, &listener, change::resolve(current, &path), &Value::Null);
            if options.once {
                return subscription;
            }
            table = self.table.borrow_mut();
        }

        table.by_path.entry(path).or_default().push(listener);
        subscription
    }

    /// Notify every path whose value differs between `prev` and `next`.
    /// Returns the number of callbacks invoked.
    pub fn notify(&self, prev: &Value, next: &Value) -> usize {
        // Deliver against a snapshot so (un)subscribing inside a callback
        // does not disturb this pass.
        let snapshot: Vec<(String, Vec<Rc<Listener>>)> = self
            .table
            .borrow()
            .by_path
            .iter()
            .map(|(path, listeners)| (path.clone(), listeners.clone()))
            .collect();

        let mut invoked = 0;
        for (path, listeners) in snapshot {
            let before = change::resolve(prev, &path);
            let after = change::resolve(next, &path);
            if change::equal(before, after) {
                continue;
            }

            for listener in listeners {
                if listener.once {
                    self.table.borrow_mut().remove(&path, listener.id);
                }
                invoke(&path, &listener, after, before);
                invoked += 1;
            }
        }
        invoked
    }

    /// Number of listeners registered for `path`.
    pub fn listener_count(&self, path: &str) -> usize {
        self.table
            .borrow()
            .by_path
            .get(path)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.table.borrow_mut().by_path.clear();
    }
}

fn invoke(path: &str, listener: &Listener, next: &Value, prev: &Value) {
    let Ok(mut guard) = listener.callback.try_borrow_mut() else {
        error!("Subscriber for `{}` is already running; skipping nested call", path);
        return;
    };
    let callback: &mut Callback = &mut guard;
    let result = catch_unwind(AssertUnwindSafe(|| callback(next, prev)));
    if let Err(payload) = result {
        error!("Subscriber for `{}` panicked: {}", path, panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
