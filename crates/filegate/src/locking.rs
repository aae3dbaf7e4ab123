use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/* 📖 # Why is LockStrategy a trait instead of a struct?

Using a trait enables two key benefits:
1. **Choice at construction**: a handle picks its synchronization once,
   through its type parameter, with no per-call dispatch cost
2. **Compile-time contracts**: the null variant is built on a bare
   `RefCell`, so a handle using it is `!Sync` and cannot be shared
   across threads by accident

The guard returned by `acquire` is RAII: the lock (if any) is released
when the guard goes out of scope, on every exit path.
*/

/// Pluggable mutual-exclusion behavior guarding a handle's stream state.
///
/// Two implementations are provided:
/// - [`ReentrantLocker`]: reentrant lock, safe for concurrent use
/// - [`NullLocker`]: no synchronization, single-thread only
pub trait LockStrategy<T>: fmt::Debug {
    /// Guard granting access to the protected cell for as long as it lives.
    type Guard<'a>: Deref<Target = RefCell<T>>
    where
        Self: 'a,
        T: 'a;

    /// Wraps `value` in this strategy's protection.
    fn new(value: T) -> Self;

    /// Blocks until the calling thread holds the lock, then grants access.
    ///
    /// For the reentrant variant a thread already holding the lock may
    /// acquire it again without blocking itself; acquisitions are
    /// reference-counted and released as the guards drop.
    fn acquire(&self) -> Self::Guard<'_>;

    /// Direct access through an exclusive borrow, bypassing the lock.
    ///
    /// Sound without locking: `&mut self` proves no other borrow exists.
    fn get_mut(&mut self) -> &mut T;
}

/// Locking strategy backed by a reentrant mutex.
///
/// The `ReentrantMutex<RefCell<T>>` composition gives re-entrancy and
/// mutability: the mutex serializes threads, the cell hands out the
/// mutable borrow. Composite operations hold the outer guard while inner
/// operations re-acquire; borrows of the cell never overlap because the
/// outer level only holds the lock, not a borrow.
#[derive(Debug)]
pub struct ReentrantLocker<T>(ReentrantMutex<RefCell<T>>);

impl<T: fmt::Debug> LockStrategy<T> for ReentrantLocker<T> {
    type Guard<'a>
        = ReentrantMutexGuard<'a, RefCell<T>>
    where
        Self: 'a,
        T: 'a;

    fn new(value: T) -> Self {
        Self(ReentrantMutex::new(RefCell::new(value)))
    }

    fn acquire(&self) -> Self::Guard<'_> {
        self.0.lock()
    }

    fn get_mut(&mut self) -> &mut T {
        self.0.get_mut().get_mut()
    }
}

/// Locking strategy that performs no synchronization.
///
/// Used when single-threaded access is guaranteed by the caller, trading
/// safety for reduced overhead. Because the state lives in a bare
/// `RefCell`, anything built on this strategy is `!Sync`.
#[derive(Debug)]
pub struct NullLocker<T>(RefCell<T>);

impl<T: fmt::Debug> LockStrategy<T> for NullLocker<T> {
    type Guard<'a>
        = &'a RefCell<T>
    where
        Self: 'a,
        T: 'a;

    fn new(value: T) -> Self {
        Self(RefCell::new(value))
    }

    fn acquire(&self) -> Self::Guard<'_> {
        &self.0
    }

    fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }
}
