use crate::atomic::{AtomicBool, Ordering};

/// A boolean with serialized read, write, and read-modify-write access.
///
/// Every update happens-before every subsequent read on any thread, so a
/// flag set by one thread is immediately visible to all others. Useful as a
/// cross-thread signal, and the building block of [`Interrupt`](crate::Interrupt).
///
/// # Examples
///
/// ```
/// use weir::AtomicFlag;
///
/// let flag = AtomicFlag::new(false);
/// assert!(!flag.get());
/// flag.set(true);
/// assert!(flag.get());
/// ```
#[derive(Debug, Default)]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(initial: bool) -> Self {
        Self {
            value: AtomicBool::new(initial),
        }
    }

    /// Returns the current value.
    #[inline(always)]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::SeqCst)
    }

    /// Unconditionally stores `value`.
    #[inline(always)]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Atomically stores `value` and returns the previous value.
    ///
    /// # Examples
    ///
    /// ```
    /// use weir::AtomicFlag;
    ///
    /// let flag = AtomicFlag::new(false);
    /// assert!(!flag.get_and_set(true));
    /// assert!(flag.get());
    /// ```
    #[inline(always)]
    pub fn get_and_set(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::SeqCst)
    }

    /// Stores `new` only if the current value equals `expected`.
    ///
    /// Returns `true` on success. Never fails spuriously.
    ///
    /// # Examples
    ///
    /// ```
    /// use weir::AtomicFlag;
    ///
    /// let flag = AtomicFlag::new(false);
    /// assert!(flag.compare_and_set(false, true));
    /// assert!(!flag.compare_and_set(false, true));
    /// ```
    #[inline(always)]
    pub fn compare_and_set(&self, expected: bool, new: bool) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Like [`compare_and_set`](AtomicFlag::compare_and_set), but may fail
    /// spuriously even when the current value equals `expected`.
    #[inline(always)]
    pub fn weak_compare_and_set(&self, expected: bool, new: bool) -> bool {
        self.value
            .compare_exchange_weak(expected, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
