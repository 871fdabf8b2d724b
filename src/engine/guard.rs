//! Mutual exclusion for mutating entry points.
//!
//! Mutating calls from different threads run one at a time: a call waits
//! until the current holder releases the guard. A nested call from the thread
//! that already holds it fails immediately with [`Error::Reentrancy`].

use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Serializing guard that rejects same-thread reentry
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
}

/// Proof that the guard is held; releases it when dropped
#[derive(Debug)]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    /// Create a released guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, waiting for another thread's operation to finish.
    ///
    /// Fails with `Reentrancy` if the calling thread already holds it.
    pub fn enter(&self) -> Result<GuardToken<'_>> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().map_err(|_| Error::Lock)?;

        loop {
            match *owner {
                None => {
                    *owner = Some(me);
                    return Ok(GuardToken { guard: self });
                }
                Some(holder) if holder == me => {
                    warn!("rejected nested call into a mutating entry point");
                    return Err(Error::Reentrancy);
                }
                Some(_) => {
                    debug!("waiting for in-flight operation");
                    owner = self.released.wait(owner).map_err(|_| Error::Lock)?;
                }
            }
        }
    }

    /// Whether a mutating call is in progress
    pub fn is_entered(&self) -> bool {
        self.owner
            .lock()
            .map(|owner| owner.is_some())
            .unwrap_or(true)
    }
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        let mut owner = self
            .guard
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *owner = None;
        self.guard.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_enter_and_release() {
        let guard = ReentrancyGuard::new();
        {
            let _token = guard.enter().unwrap();
            assert!(guard.is_entered());
        }
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_nested_enter_rejected() {
        let guard = ReentrancyGuard::new();
        let _token = guard.enter().unwrap();
        assert_eq!(guard.enter().unwrap_err(), Error::Reentrancy);
    }

    #[test]
    fn test_released_on_error_path() {
        fn failing(guard: &ReentrancyGuard) -> Result<()> {
            let _token = guard.enter()?;
            Err(Error::TransferFailed)
        }

        let guard = ReentrancyGuard::new();
        assert!(failing(&guard).is_err());
        assert!(!guard.is_entered());
    }

    #[test]
    fn test_other_thread_waits_for_release() {
        let guard = ReentrancyGuard::new();
        let (done_tx, done_rx) = mpsc::channel();

        let token = guard.enter().unwrap();
        thread::scope(|scope| {
            let shared = &guard;
            let waiter = scope.spawn(move || {
                let entered = shared.enter().map(|_| ());
                done_tx.send(()).unwrap();
                entered
            });

            assert!(done_rx.try_recv().is_err());
            drop(token);
            assert_eq!(waiter.join().unwrap(), Ok(()));
        });
        assert!(!guard.is_entered());
    }

    #[test]
    fn test_threads_run_one_at_a_time() {
        let guard = ReentrancyGuard::new();
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let _token = guard.enter().unwrap();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
