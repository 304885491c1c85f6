// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared futures returned by bound member functions.
//!
//! A [`SharedFuture`] is a cloneable, multi-reader handle on a value that
//! some other thread produces through a [`Promise`]. The invocation engine
//! never blocks on one: it moves the handle into the caller's result buffer
//! and the caller decides when to poll ([`SharedFuture::is_ready`]) or
//! block ([`SharedFuture::get`]).
//!
//! ```
//! use typebridge::SharedFuture;
//! use std::time::Duration;
//!
//! let fut = SharedFuture::spawn(|| 21 * 2);
//! assert_eq!(fut.get_timeout(Duration::from_secs(5)), Ok(42));
//! ```

use crate::error::{BridgeError, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

enum Slot<T> {
    Pending,
    Ready(T),
    Broken,
}

struct State<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> State<T> {
    fn pending() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot::Pending),
            ready: Condvar::new(),
        })
    }
}

/// Outcome of waiting on a future without taking its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureWait {
    Ready,
    TimedOut,
    Invalid,
    Broken,
}

/// Producer side of a [`SharedFuture`].
///
/// Dropping a promise without calling [`Promise::set_value`] marks every
/// associated future as broken, which wakes blocked readers.
pub struct Promise<T> {
    state: Option<Arc<State<T>>>,
}

impl<T> Promise<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Some(State::pending()),
        }
    }

    /// A reader handle on this promise's value.
    #[must_use]
    pub fn future(&self) -> SharedFuture<T> {
        SharedFuture {
            state: self.state.clone(),
        }
    }

    /// Publish the value and wake all readers.
    pub fn set_value(mut self, value: T) {
        if let Some(state) = self.state.take() {
            *state.slot.lock() = Slot::Ready(value);
            state.ready.notify_all();
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let mut slot = state.slot.lock();
            if matches!(*slot, Slot::Pending) {
                *slot = Slot::Broken;
            }
            drop(slot);
            state.ready.notify_all();
        }
    }
}

/// Cloneable handle on a value produced asynchronously.
///
/// `SharedFuture::default()` is an invalid future with no shared state.
pub struct SharedFuture<T> {
    state: Option<Arc<State<T>>>,
}

impl<T> SharedFuture<T> {
    /// A future with no shared state.
    #[must_use]
    pub const fn invalid() -> Self {
        Self { state: None }
    }

    /// A future whose value is already available.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self {
            state: Some(Arc::new(State {
                slot: Mutex::new(Slot::Ready(value)),
                ready: Condvar::new(),
            })),
        }
    }

    /// Run `f` on a new thread and return a future on its result.
    ///
    /// If `f` panics the future becomes broken.
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let promise = Promise::new();
        let future = promise.future();
        thread::spawn(move || promise.set_value(f()));
        future
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.is_some()
    }

    /// `true` once a value was set or the producer went away, i.e. when a
    /// subsequent `get` will not block.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| !matches!(*s.slot.lock(), Slot::Pending))
    }

    /// Block until ready or until `timeout` elapses (`None` waits forever).
    pub fn wait(&self, timeout: Option<Duration>) -> FutureWait {
        let Some(state) = &self.state else {
            return FutureWait::Invalid;
        };
        // A timeout past the clock's range waits forever.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut slot = state.slot.lock();
        loop {
            match &*slot {
                Slot::Ready(_) => return FutureWait::Ready,
                Slot::Broken => return FutureWait::Broken,
                Slot::Pending => {}
            }
            match deadline {
                None => state.ready.wait(&mut slot),
                Some(deadline) => {
                    if state.ready.wait_until(&mut slot, deadline).timed_out()
                        && matches!(*slot, Slot::Pending)
                    {
                        return FutureWait::TimedOut;
                    }
                }
            }
        }
    }
}

impl<T: Clone> SharedFuture<T> {
    /// Block until the value is available and return a copy of it.
    pub fn get(&self) -> Result<T> {
        self.get_with(None)
    }

    /// Like [`SharedFuture::get`] but gives up after `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        self.get_with(Some(timeout))
    }

    pub(crate) fn get_with(&self, timeout: Option<Duration>) -> Result<T> {
        match self.wait(timeout) {
            FutureWait::Invalid => Err(BridgeError::FutureInvalid),
            FutureWait::TimedOut => Err(BridgeError::FutureTimeout),
            FutureWait::Broken => Err(BridgeError::FutureBroken),
            FutureWait::Ready => {
                let Some(state) = &self.state else {
                    return Err(BridgeError::FutureInvalid);
                };
                match &*state.slot.lock() {
                    Slot::Ready(value) => Ok(value.clone()),
                    _ => Err(BridgeError::FutureBroken),
                }
            }
        }
    }
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for SharedFuture<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Two handles are equal when they share the same state.
impl<T> PartialEq for SharedFuture<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for SharedFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFuture")
            .field("valid", &self.is_valid())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_future() {
        let fut = SharedFuture::ready(7i32);
        assert!(fut.is_valid());
        assert!(fut.is_ready());
        assert_eq!(fut.get(), Ok(7));
        // Shared: every reader sees the value.
        let other = fut.clone();
        assert_eq!(other.get(), Ok(7));
        assert_eq!(fut, other);
    }

    #[test]
    fn test_invalid_future() {
        let fut: SharedFuture<f64> = SharedFuture::default();
        assert!(!fut.is_valid());
        assert!(!fut.is_ready());
        assert_eq!(fut.wait(None), FutureWait::Invalid);
        assert_eq!(fut.get(), Err(BridgeError::FutureInvalid));
    }

    #[test]
    fn test_promise_wakes_reader() {
        let promise = Promise::new();
        let fut = promise.future();
        assert!(!fut.is_ready());

        let reader = {
            let fut = fut.clone();
            thread::spawn(move || fut.get())
        };
        thread::sleep(Duration::from_millis(20));
        promise.set_value(String::from("done"));

        assert_eq!(reader.join().expect("reader thread"), Ok("done".to_string()));
        assert!(fut.is_ready());
    }

    #[test]
    fn test_timeout_then_value() {
        let promise = Promise::new();
        let fut = promise.future();
        assert_eq!(
            fut.get_timeout(Duration::from_millis(10)),
            Err(BridgeError::FutureTimeout)
        );
        promise.set_value(3u8);
        assert_eq!(fut.get_timeout(Duration::from_millis(10)), Ok(3));
    }

    #[test]
    fn test_dropped_promise_breaks_future() {
        let promise: Promise<u32> = Promise::new();
        let fut = promise.future();
        drop(promise);
        assert!(fut.is_ready());
        assert_eq!(fut.get(), Err(BridgeError::FutureBroken));
    }

    #[test]
    fn test_spawn_panicking_producer() {
        let fut: SharedFuture<u32> = SharedFuture::spawn(|| panic!("producer failed"));
        assert_eq!(fut.wait(Some(Duration::from_secs(5))), FutureWait::Broken);
    }

    #[test]
    fn test_spawn_delayed_value() {
        let fut = SharedFuture::spawn(|| {
            thread::sleep(Duration::from_millis(10));
            vec![0i32, 1, 4, 9]
        });
        assert_eq!(fut.get(), Ok(vec![0, 1, 4, 9]));
    }

    #[test]
    fn test_unbounded_timeout_waits_for_value() {
        let promise = Promise::new();
        let fut = promise.future();
        let reader = {
            let fut = fut.clone();
            thread::spawn(move || fut.get_timeout(Duration::MAX))
        };
        thread::sleep(Duration::from_millis(10));
        promise.set_value(11i64);
        assert_eq!(reader.join().expect("reader thread"), Ok(11));
        assert_eq!(fut.wait(Some(Duration::MAX)), FutureWait::Ready);
    }
}
