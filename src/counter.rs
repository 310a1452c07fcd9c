use crate::atomic::{AtomicI64, Ordering};

/// An integer with serialized read, write, and arithmetic access.
///
/// All operations are individually atomic and sequentially consistent: no
/// intermediate state is observable, and every update happens-before every
/// subsequent read on any thread. Arithmetic wraps on overflow. Narrowing the
/// result to a smaller integer width is an `as` cast, which truncates.
///
/// # Examples
///
/// ```
/// use weir::AtomicCounter;
///
/// let counter = AtomicCounter::new(0);
/// assert_eq!(counter.get_and_increment(), 0);
/// assert_eq!(counter.increment_and_get(), 2);
/// assert_eq!(counter.add_and_get(-2), 0);
/// ```
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicI64,
}

impl AtomicCounter {
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }

    /// Returns the current value.
    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Unconditionally stores `value`.
    #[inline(always)]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Atomically stores `value` and returns the previous value.
    #[inline(always)]
    pub fn get_and_set(&self, value: i64) -> i64 {
        self.value.swap(value, Ordering::SeqCst)
    }

    /// Stores `new` only if the current value equals `expected`.
    ///
    /// Returns `true` on success. Never fails spuriously.
    #[inline(always)]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Like [`compare_and_set`](AtomicCounter::compare_and_set), but may fail
    /// spuriously even when the current value equals `expected`.
    #[inline(always)]
    pub fn weak_compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange_weak(expected, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Atomically adds one and returns the previous value.
    #[inline(always)]
    pub fn get_and_increment(&self) -> i64 {
        self.get_and_add(1)
    }

    /// Atomically subtracts one and returns the previous value.
    #[inline(always)]
    pub fn get_and_decrement(&self) -> i64 {
        self.get_and_add(-1)
    }

    /// Atomically adds one and returns the updated value.
    #[inline(always)]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Atomically subtracts one and returns the updated value.
    #[inline(always)]
    pub fn decrement_and_get(&self) -> i64 {
        self.add_and_get(-1)
    }

    /// Atomically adds `delta` and returns the previous value.
    #[inline(always)]
    pub fn get_and_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst)
    }

    /// Atomically adds `delta` and returns the updated value.
    #[inline(always)]
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta)
    }
}
