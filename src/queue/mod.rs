//! Bounded, blocking FIFO queue.
//!
//! A fixed-capacity circular buffer behind a single mutex, with two condition
//! variables: producers wait on `not_full`, consumers wait on `not_empty`.
//! Every operation acquires the mutex, so any observation of the queue is
//! coherent and elements always leave in the order they arrived.
//!
//! # Fairness
//!
//! In non-fair mode (the default) a signalled condition wakes an arbitrary
//! waiter, and a freshly arrived thread may barge past sleepers when it finds
//! its predicate already true. In fair mode each condition keeps an explicit
//! FIFO of waiting threads and a freed slot is granted to the longest waiter,
//! so threads blocked on the same condition are served in arrival order.
//! Fair mode costs a broadcast wake-up per signal; prefer non-fair unless
//! starvation among waiters actually matters.
//!
//! # When to use
//!
//! Use this queue to hand work between threads when you want bounded memory
//! and back-pressure: a full queue slows producers down instead of growing.
//! If you need nanosecond-scale hand-off and can spin, a lock-free queue is
//! the better tool; this one trades peak throughput for blocking waits,
//! timeouts, interruption, and draining.
//!
//! # Reference
//!
//! * The classic two-condition monitor bounded buffer; the operation surface
//!   follows `java.util.concurrent`'s `ArrayBlockingQueue`.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::MutexGuard;

use crate::error::{
    ConstructError, DrainError, Interrupted, OfferError, QueueEmpty, QueueFull,
};
use crate::interrupt::Interrupt;

pub use self::drain::Sink;

use self::drain::Drainer;
use self::ring::RingBuffer;
use self::waiters::{Cond, Control, WaitAbort, WaitCoordinator};

mod drain;
mod ring;
pub(crate) mod waiters;

/// A bounded, thread-safe, blocking FIFO queue.
///
/// `BlockingQueue` is a handle: cloning it is cheap and every clone operates
/// on the same underlying queue, so one clone per thread is the usual setup.
/// All operations take `&self`.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use weir::{BlockingQueue, Interrupt};
///
/// let queue = BlockingQueue::new(4).unwrap();
/// let interrupt = Interrupt::new();
///
/// let producer = {
///     let queue = queue.clone();
///     let interrupt = interrupt.clone();
///     thread::spawn(move || {
///         for i in 0..100 {
///             queue.put(i, &interrupt).unwrap();
///         }
///     })
/// };
///
/// let interrupt = Interrupt::new();
/// for i in 0..100 {
///     assert_eq!(queue.take(&interrupt).unwrap(), i);
/// }
/// producer.join().unwrap();
/// ```
pub struct BlockingQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    coordinator: Arc<WaitCoordinator>,
    capacity: usize,
    /// Element storage, guarded by the coordinator's control mutex.
    ring: UnsafeCell<RingBuffer<T>>,
}

// SAFETY: the ring is only touched through `Inner::ring` while holding the
// coordinator's control lock, so `&Inner` can be shared across threads
// whenever the elements themselves can move between threads.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Inner<T> {
    /// Exclusive access to the element storage.
    ///
    /// # Safety
    ///
    /// `control` must be the guard of this queue's own coordinator. Borrowing
    /// the guard mutably for the lifetime of the returned reference keeps the
    /// access exclusive.
    #[allow(clippy::mut_from_ref)]
    unsafe fn ring<'a>(&'a self, _control: &'a mut MutexGuard<'_, Control>) -> &'a mut RingBuffer<T> {
        unsafe { &mut *self.ring.get() }
    }

    fn ready(&self, cond: Cond, control: &mut MutexGuard<'_, Control>) -> bool {
        // SAFETY: `control` is this queue's guard; see the only callers.
        let ring = unsafe { self.ring(control) };
        match cond {
            Cond::NotEmpty => !ring.is_empty(),
            Cond::NotFull => !ring.is_full(),
        }
    }

    /// Blocks until `cond`'s predicate holds, the deadline passes, or the
    /// token is raised. Returns with the lock held in every case.
    fn block_until(
        &self,
        cond: Cond,
        control: &mut MutexGuard<'_, Control>,
        deadline: Option<Instant>,
        interrupt: &Interrupt,
    ) -> Result<(), WaitAbort> {
        if interrupt.is_interrupted() {
            return Err(WaitAbort::Interrupted);
        }
        if self.ready(cond, control) {
            // An arrival that finds its predicate true proceeds immediately,
            // even ahead of fair-mode waiters.
            return Ok(());
        }

        let _attached = interrupt.attach(&self.coordinator);
        if interrupt.is_interrupted() {
            // The raise may have landed before we registered for wake-ups.
            return Err(WaitAbort::Interrupted);
        }

        if self.coordinator.is_fair() {
            self.wait_fair(cond, control, deadline, interrupt)
        } else {
            self.wait_unfair(cond, control, deadline, interrupt)
        }
    }

    fn wait_unfair(
        &self,
        cond: Cond,
        control: &mut MutexGuard<'_, Control>,
        deadline: Option<Instant>,
        interrupt: &Interrupt,
    ) -> Result<(), WaitAbort> {
        loop {
            let timed_out = self.coordinator.park(cond, control, deadline);

            if interrupt.is_interrupted() {
                // Pass along a wake-up this interrupt may have swallowed.
                if self.ready(cond, control) {
                    self.coordinator.signal_one(control, cond);
                }
                return Err(WaitAbort::Interrupted);
            }
            if self.ready(cond, control) {
                return Ok(());
            }
            if timed_out {
                return Err(WaitAbort::TimedOut);
            }
        }
    }

    fn wait_fair(
        &self,
        cond: Cond,
        control: &mut MutexGuard<'_, Control>,
        deadline: Option<Instant>,
        interrupt: &Interrupt,
    ) -> Result<(), WaitAbort> {
        let ticket = self.coordinator.next_ticket();
        control.fifo_mut(cond).push_back(ticket);

        loop {
            let timed_out = self.coordinator.park(cond, control, deadline);

            if interrupt.is_interrupted() {
                if control.fifo_mut(cond).revoke(ticket) {
                    // A grant raced the interrupt; hand it to the next waiter.
                    if self.ready(cond, control) {
                        self.coordinator.signal_one(control, cond);
                    }
                } else {
                    control.fifo_mut(cond).cancel(ticket);
                }
                return Err(WaitAbort::Interrupted);
            }
            if control.fifo_mut(cond).revoke(ticket) {
                if self.ready(cond, control) {
                    return Ok(());
                }
                // The freed slot was taken by a barging arrival. Keep our
                // place at the head and wait for the next one.
                control.fifo_mut(cond).push_front(ticket);
                continue;
            }
            if timed_out {
                control.fifo_mut(cond).cancel(ticket);
                return Err(WaitAbort::TimedOut);
            }
        }
    }
}

impl<T> BlockingQueue<T> {
    /// Creates a non-fair queue holding up to `capacity` elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use weir::{BlockingQueue, ConstructError};
    ///
    /// let queue = BlockingQueue::<u32>::new(16).unwrap();
    /// assert_eq!(queue.capacity(), 16);
    /// assert_eq!(
    ///     BlockingQueue::<u32>::new(0).unwrap_err(),
    ///     ConstructError::InvalidCapacity,
    /// );
    /// ```
    pub fn new(capacity: usize) -> Result<Self, ConstructError> {
        Self::with_fairness(capacity, false)
    }

    /// Creates a queue with the given waiter wake-up discipline.
    pub fn with_fairness(capacity: usize, fair: bool) -> Result<Self, ConstructError> {
        if capacity == 0 {
            return Err(ConstructError::InvalidCapacity);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                coordinator: Arc::new(WaitCoordinator::new(fair)),
                capacity,
                ring: UnsafeCell::new(RingBuffer::with_capacity(capacity)),
            }),
        })
    }

    /// Creates a queue seeded with `initial`, in iteration order.
    ///
    /// The seeded elements occupy the first slots; the head of the queue is
    /// the first element the iterator yielded.
    ///
    /// # Examples
    ///
    /// ```
    /// use weir::{BlockingQueue, ConstructError};
    ///
    /// let queue = BlockingQueue::with_initial(3, false, [1, 2]).unwrap();
    /// assert_eq!(queue.poll(), Some(1));
    ///
    /// assert_eq!(
    ///     BlockingQueue::with_initial(1, false, [1, 2]).unwrap_err(),
    ///     ConstructError::CollectionTooLarge { len: 2, capacity: 1 },
    /// );
    /// ```
    pub fn with_initial<I>(capacity: usize, fair: bool, initial: I) -> Result<Self, ConstructError>
    where
        I: IntoIterator<Item = T>,
    {
        if capacity == 0 {
            return Err(ConstructError::InvalidCapacity);
        }
        let initial: Vec<T> = initial.into_iter().collect();
        if initial.len() > capacity {
            return Err(ConstructError::CollectionTooLarge {
                len: initial.len(),
                capacity,
            });
        }

        let queue = Self::with_fairness(capacity, fair)?;
        {
            let mut control = queue.inner.coordinator.lock();
            // SAFETY: `control` is this queue's guard.
            let ring = unsafe { queue.inner.ring(&mut control) };
            for value in initial {
                ring.enqueue(value);
            }
        }
        Ok(queue)
    }

    /// Maximum number of elements the queue can hold.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Whether waiters are woken in strict arrival order.
    pub fn is_fair(&self) -> bool {
        self.inner.coordinator.is_fair()
    }

    /// Number of elements currently in the queue.
    pub fn len(&self) -> usize {
        let mut control = self.inner.coordinator.lock();
        unsafe { self.inner.ring(&mut control) }.len()
    }

    /// Free slots: `capacity() - len()`.
    pub fn remaining_capacity(&self) -> usize {
        let mut control = self.inner.coordinator.lock();
        let ring = unsafe { self.inner.ring(&mut control) };
        ring.capacity() - ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.remaining_capacity() == 0
    }

    /// Inserts without blocking, handing the element back when the queue is
    /// full.
    ///
    /// # Examples
    ///
    /// ```
    /// use weir::BlockingQueue;
    ///
    /// let queue = BlockingQueue::new(1).unwrap();
    /// assert_eq!(queue.offer(1), Ok(()));
    /// assert_eq!(queue.offer(2), Err(2));
    /// ```
    pub fn offer(&self, value: T) -> Result<(), T> {
        let mut control = self.inner.coordinator.lock();
        // SAFETY: `control` is this queue's guard.
        let ring = unsafe { self.inner.ring(&mut control) };
        if ring.is_full() {
            return Err(value);
        }
        ring.enqueue(value);
        self.inner.coordinator.signal_one(&mut control, Cond::NotEmpty);
        Ok(())
    }

    /// Inserts without blocking, failing with [`QueueFull`] when no slot is
    /// free.
    pub fn add(&self, value: T) -> Result<(), QueueFull<T>> {
        self.offer(value).map_err(QueueFull)
    }

    /// Inserts, waiting up to `timeout` for a slot.
    ///
    /// Spurious and premature wake-ups re-arm with the remaining time; the
    /// budget never resets. A timeout of [`Duration::MAX`] waits without a
    /// deadline but stays interruptible.
    pub fn offer_timeout(
        &self,
        value: T,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<(), OfferError<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut control = self.inner.coordinator.lock();
        match self.inner.block_until(Cond::NotFull, &mut control, deadline, interrupt) {
            Ok(()) => {}
            Err(WaitAbort::TimedOut) => return Err(OfferError::TimedOut(value)),
            Err(WaitAbort::Interrupted) => return Err(OfferError::Interrupted(value)),
        }
        // SAFETY: `control` is this queue's guard.
        let ring = unsafe { self.inner.ring(&mut control) };
        ring.enqueue(value);
        self.inner.coordinator.signal_one(&mut control, Cond::NotEmpty);
        Ok(())
    }

    /// Inserts, waiting as long as it takes for a slot to free up.
    ///
    /// Fails only when `interrupt` is raised; the element comes back inside
    /// the error.
    pub fn put(&self, value: T, interrupt: &Interrupt) -> Result<(), Interrupted<T>> {
        let mut control = self.inner.coordinator.lock();
        if self
            .inner
            .block_until(Cond::NotFull, &mut control, None, interrupt)
            .is_err()
        {
            // Without a deadline the only abort is interruption.
            return Err(Interrupted(value));
        }
        // SAFETY: `control` is this queue's guard.
        let ring = unsafe { self.inner.ring(&mut control) };
        ring.enqueue(value);
        self.inner.coordinator.signal_one(&mut control, Cond::NotEmpty);
        Ok(())
    }

    /// Removes the head without blocking.
    ///
    /// # Examples
    ///
    /// ```
    /// use weir::BlockingQueue;
    ///
    /// let queue = BlockingQueue::with_initial(2, false, [7]).unwrap();
    /// assert_eq!(queue.poll(), Some(7));
    /// assert_eq!(queue.poll(), None);
    /// ```
    pub fn poll(&self) -> Option<T> {
        let mut control = self.inner.coordinator.lock();
        // SAFETY: `control` is this queue's guard.
        let value = unsafe { self.inner.ring(&mut control) }.dequeue()?;
        self.inner.coordinator.signal_one(&mut control, Cond::NotFull);
        Some(value)
    }

    /// Removes the head, waiting up to `timeout` for an element.
    ///
    /// `Ok(None)` means the deadline passed with the queue still empty.
    pub fn poll_timeout(
        &self,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<Option<T>, Interrupted> {
        let deadline = Instant::now().checked_add(timeout);
        let mut control = self.inner.coordinator.lock();
        match self.inner.block_until(Cond::NotEmpty, &mut control, deadline, interrupt) {
            Ok(()) => {}
            Err(WaitAbort::TimedOut) => return Ok(None),
            Err(WaitAbort::Interrupted) => return Err(Interrupted(())),
        }
        // SAFETY: `control` is this queue's guard.
        let value = unsafe { self.inner.ring(&mut control) }
            .dequeue()
            .expect("queue non-empty after not_empty wait");
        self.inner.coordinator.signal_one(&mut control, Cond::NotFull);
        Ok(Some(value))
    }

    /// Removes the head, waiting as long as it takes for an element.
    pub fn take(&self, interrupt: &Interrupt) -> Result<T, Interrupted> {
        let mut control = self.inner.coordinator.lock();
        if self
            .inner
            .block_until(Cond::NotEmpty, &mut control, None, interrupt)
            .is_err()
        {
            return Err(Interrupted(()));
        }
        // SAFETY: `control` is this queue's guard.
        let value = unsafe { self.inner.ring(&mut control) }
            .dequeue()
            .expect("queue non-empty after not_empty wait");
        self.inner.coordinator.signal_one(&mut control, Cond::NotFull);
        Ok(value)
    }

    /// Removes the head without blocking, failing with [`QueueEmpty`] when
    /// there is none.
    pub fn remove(&self) -> Result<T, QueueEmpty> {
        self.poll().ok_or(QueueEmpty)
    }

    /// Copy of the head element, without removing it.
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        let mut control = self.inner.coordinator.lock();
        unsafe { self.inner.ring(&mut control) }.peek().cloned()
    }

    /// Whether some element equal to `value` is currently in the queue.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        let mut control = self.inner.coordinator.lock();
        unsafe { self.inner.ring(&mut control) }
            .iter()
            .any(|element| element == value)
    }

    /// The queue's elements in take-order, copied out under one lock
    /// acquisition.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut control = self.inner.coordinator.lock();
        unsafe { self.inner.ring(&mut control) }.iter().cloned().collect()
    }

    /// A weakly consistent iterator: a snapshot taken under one lock
    /// acquisition. It never observes a torn state and never fails because
    /// of concurrent modification; insertions and removals after the call
    /// are simply not reflected.
    pub fn iter(&self) -> Iter<T>
    where
        T: Clone,
    {
        Iter {
            snapshot: self.to_vec().into_iter(),
        }
    }

    /// Discards every element, waking one blocked producer per freed slot.
    pub fn clear(&self) {
        let mut control = self.inner.coordinator.lock();
        // SAFETY: `control` is this queue's guard.
        let freed = unsafe { self.inner.ring(&mut control) }.clear();
        for _ in 0..freed {
            self.inner.coordinator.signal_one(&mut control, Cond::NotFull);
        }
    }

    /// Moves every element into `sink` in take-order, under a single lock
    /// acquisition. Returns the number moved.
    ///
    /// # Examples
    ///
    /// ```
    /// use weir::BlockingQueue;
    ///
    /// let queue = BlockingQueue::with_initial(4, false, ["a", "b", "c"]).unwrap();
    /// let mut sink = Vec::new();
    /// assert_eq!(queue.drain_to(&mut sink), Ok(3));
    /// assert_eq!(sink, ["a", "b", "c"]);
    /// assert!(queue.is_empty());
    /// ```
    pub fn drain_to<S: Sink<T>>(&self, sink: &mut S) -> Result<usize, DrainError> {
        self.drain_to_limit(sink, usize::MAX)
    }

    /// Moves up to `max` elements into `sink` in take-order. `max == 0`
    /// moves none.
    pub fn drain_to_limit<S: Sink<T>>(&self, sink: &mut S, max: usize) -> Result<usize, DrainError> {
        self.reject_self_drain(sink)?;
        let mut control = self.inner.coordinator.lock();
        let mut drainer = Drainer::new(sink, max);
        // SAFETY: `control` is this queue's guard.
        let outcome = drainer.drain_head(unsafe { self.inner.ring(&mut control) });
        for _ in 0..drainer.freed() {
            self.inner.coordinator.signal_one(&mut control, Cond::NotFull);
        }
        outcome
    }

    /// Moves every element matching `matches` into `sink`; the rest keep
    /// their relative order.
    ///
    /// `matches` runs under the queue's mutex: it must be a pure decision on
    /// the element, and must not touch the queue or block.
    pub fn drain_where<S, P>(&self, sink: &mut S, matches: P) -> Result<usize, DrainError>
    where
        S: Sink<T>,
        P: FnMut(&T) -> bool,
    {
        self.reject_self_drain(sink)?;
        let mut control = self.inner.coordinator.lock();
        let mut drainer = Drainer::new(sink, usize::MAX);
        // SAFETY: `control` is this queue's guard.
        let outcome = drainer.drain_matching(unsafe { self.inner.ring(&mut control) }, matches);
        for _ in 0..drainer.freed() {
            self.inner.coordinator.signal_one(&mut control, Cond::NotFull);
        }
        outcome
    }

    fn reject_self_drain<S: Sink<T>>(&self, sink: &S) -> Result<(), DrainError> {
        if sink.queue_addr() == Some(Arc::as_ptr(&self.inner) as usize) {
            return Err(DrainError::SelfDrain);
        }
        Ok(())
    }
}

impl<T> Clone for BlockingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("fair", &self.is_fair())
            .finish()
    }
}

impl<T> Sink<T> for BlockingQueue<T> {
    /// A non-blocking offer; hands the element back when this queue is full.
    ///
    /// Accepting locks this queue while the source queue's lock is held, so
    /// two queues must not drain into each other concurrently.
    fn accept(&mut self, value: T) -> Result<(), T> {
        self.offer(value)
    }

    fn queue_addr(&self) -> Option<usize> {
        Some(Arc::as_ptr(&self.inner) as usize)
    }
}

/// Snapshot iterator returned by [`BlockingQueue::iter`].
pub struct Iter<T> {
    snapshot: std::vec::IntoIter<T>,
}

impl<T> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.snapshot.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.snapshot.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<T> {}

#[cfg(all(test, not(feature = "loom")))]
mod test {
    use super::*;

    use crate::thread;
    use crate::{AtomicCounter, AtomicFlag};

    #[test]
    fn seeded_elements_poll_in_order() {
        let queue = BlockingQueue::with_initial(9, false, 'a'..='i').unwrap();

        for expected in 'a'..='i' {
            assert_eq!(queue.poll(), Some(expected));
        }
        assert_eq!(queue.poll(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn empty_queue_polls_stay_empty() {
        let queue = BlockingQueue::<u8>::new(3).unwrap();

        for _ in 0..4 {
            assert_eq!(queue.poll(), None);
        }
        assert_eq!(queue.remove(), Err(QueueEmpty));
        assert_eq!(queue.remaining_capacity(), 3);
    }

    #[test]
    fn construction_validates_parameters() {
        assert_eq!(
            BlockingQueue::<u8>::new(0).unwrap_err(),
            ConstructError::InvalidCapacity
        );
        assert_eq!(
            BlockingQueue::with_initial(2, true, [1, 2, 3]).unwrap_err(),
            ConstructError::CollectionTooLarge { len: 3, capacity: 2 }
        );

        let queue = BlockingQueue::<u8>::with_fairness(5, true).unwrap();
        assert!(queue.is_fair());
        assert_eq!(queue.capacity(), 5);
        assert!(!BlockingQueue::<u8>::new(1).unwrap().is_fair());
    }

    #[test]
    fn add_reports_full_queue() {
        let queue = BlockingQueue::with_initial(2, false, [1, 2]).unwrap();

        assert_eq!(queue.add(3), Err(QueueFull(3)));
        assert_eq!(queue.offer(3), Err(3));
        assert_eq!(queue.to_vec(), [1, 2]);
    }

    #[test]
    fn remaining_capacity_complements_len() {
        let queue = BlockingQueue::new(4).unwrap();

        for i in 0..4 {
            assert_eq!(queue.len() + queue.remaining_capacity(), 4);
            queue.offer(i).unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(queue.remaining_capacity(), 0);
        queue.poll();
        assert_eq!(queue.remaining_capacity(), 1);
    }

    #[test]
    fn window_wraps_around_the_buffer() {
        let queue = BlockingQueue::new(3).unwrap();

        for round in 0..10 {
            queue.offer(round).unwrap();
            queue.offer(round + 100).unwrap();
            assert_eq!(queue.poll(), Some(round));
            assert_eq!(queue.poll(), Some(round + 100));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn observers_do_not_disturb_the_queue() {
        let queue = BlockingQueue::with_initial(4, false, [1, 2, 3]).unwrap();

        assert_eq!(queue.peek(), Some(1));
        assert!(queue.contains(&2));
        assert!(!queue.contains(&9));
        assert_eq!(queue.iter().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn iterator_is_a_stable_snapshot() {
        let queue = BlockingQueue::with_initial(4, false, [1, 2, 3]).unwrap();

        let iter = queue.iter();
        queue.poll();
        queue.offer(4).unwrap();

        assert_eq!(iter.collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(queue.to_vec(), [2, 3, 4]);
    }

    #[test]
    fn clones_share_the_same_queue() {
        let queue = BlockingQueue::new(2).unwrap();
        let other = queue.clone();

        queue.offer(1).unwrap();
        assert_eq!(other.poll(), Some(1));
    }

    #[test]
    fn put_blocks_until_a_slot_frees() {
        let queue = BlockingQueue::with_initial(2, false, ['x', 'y']).unwrap();
        let done = std::sync::Arc::new(AtomicFlag::new(false));

        let producer = {
            let queue = queue.clone();
            let done = done.clone();
            thread::spawn(move || {
                queue.put('z', &Interrupt::new()).unwrap();
                done.set(true);
            })
        };

        thread::sleep(Duration::from_millis(150));
        assert!(!done.get());

        assert_eq!(queue.take(&Interrupt::new()).unwrap(), 'x');
        producer.join().unwrap();
        assert!(done.get());
        assert_eq!(queue.poll(), Some('y'));
        assert_eq!(queue.poll(), Some('z'));
    }

    #[test]
    fn waiting_take_receives_the_put_element() {
        let queue = BlockingQueue::<&str>::new(2).unwrap();

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.take(&Interrupt::new()))
        };

        thread::sleep(Duration::from_millis(150));
        queue.put("ping", &Interrupt::new()).unwrap();

        assert_eq!(consumer.join().unwrap(), Ok("ping"));
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_hand_off_preserves_all_elements() {
        const PRODUCERS: u64 = 4;
        const CONSUMERS: u64 = 4;
        const ITER: u64 = 1000;

        let queue = BlockingQueue::new(8).unwrap();
        let total = std::sync::Arc::new(AtomicCounter::new(0));

        thread::scope(|scope| {
            for p in 0..PRODUCERS {
                let queue = queue.clone();
                scope.spawn(move || {
                    for i in 0..ITER {
                        queue.put(p * ITER + i, &Interrupt::new()).unwrap();
                    }
                });
            }

            for _ in 0..CONSUMERS {
                let queue = queue.clone();
                let total = total.clone();
                scope.spawn(move || {
                    for _ in 0..(PRODUCERS * ITER / CONSUMERS) {
                        let value = queue.take(&Interrupt::new()).unwrap();
                        total.add_and_get(value as i64);
                    }
                });
            }
        });

        assert!(queue.is_empty());
        let n = PRODUCERS * ITER;
        assert_eq!(total.get(), (n * (n - 1) / 2) as i64);
    }

    #[test]
    fn elements_leave_in_insertion_order() {
        const COUNT: usize = 5000;

        let queue = BlockingQueue::new(4).unwrap();

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..COUNT {
                    queue.put(i, &Interrupt::new()).unwrap();
                }
            })
        };

        for i in 0..COUNT {
            assert_eq!(queue.take(&Interrupt::new()).unwrap(), i);
        }
        producer.join().unwrap();
    }

    #[test]
    fn fair_producers_unblock_in_arrival_order() {
        let queue = BlockingQueue::with_initial(3, true, [-1, -2, -3]).unwrap();
        let order = std::sync::Arc::new(AtomicCounter::new(0));
        let stamps: std::sync::Arc<Vec<AtomicCounter>> =
            std::sync::Arc::new((0..3).map(|_| AtomicCounter::new(-1)).collect());

        let mut producers = Vec::new();
        for k in 0..3usize {
            let queue = queue.clone();
            let order = order.clone();
            let stamps = stamps.clone();
            producers.push(thread::spawn(move || {
                queue
                    .offer_timeout(k as i32 + 1, Duration::from_secs(10), &Interrupt::new())
                    .unwrap();
                stamps[k].set(order.get_and_increment());
            }));
            // serialize arrival at the full queue
            thread::sleep(Duration::from_millis(150));
        }

        for _ in 0..3 {
            thread::sleep(Duration::from_millis(100));
            assert!(queue.poll().is_some());
        }
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(stamps[0].get(), 0);
        assert_eq!(stamps[1].get(), 1);
        assert_eq!(stamps[2].get(), 2);
        assert_eq!(queue.to_vec(), [1, 2, 3]);
    }

    #[test]
    fn interrupt_aborts_timed_offer() {
        let queue = BlockingQueue::with_initial(1, false, [5]).unwrap();
        let interrupt = Interrupt::new();

        let producer = {
            let queue = queue.clone();
            let interrupt = interrupt.clone();
            thread::spawn(move || queue.offer_timeout(9, Duration::from_secs(30), &interrupt))
        };

        thread::sleep(Duration::from_millis(150));
        interrupt.interrupt();

        assert_eq!(producer.join().unwrap(), Err(OfferError::Interrupted(9)));
        assert_eq!(queue.to_vec(), [5]);
    }

    #[test]
    fn interrupt_aborts_take_and_stays_raised() {
        let queue = BlockingQueue::<u32>::new(1).unwrap();
        let interrupt = Interrupt::new();

        let consumer = {
            let queue = queue.clone();
            let interrupt = interrupt.clone();
            thread::spawn(move || queue.take(&interrupt))
        };

        thread::sleep(Duration::from_millis(150));
        interrupt.interrupt();
        assert_eq!(consumer.join().unwrap(), Err(Interrupted(())));
        assert!(queue.is_empty());

        // the raised token keeps aborting until cleared
        assert!(interrupt.is_interrupted());
        assert_eq!(
            queue.poll_timeout(Duration::from_secs(1), &interrupt),
            Err(Interrupted(()))
        );
        interrupt.clear();
        assert!(!interrupt.is_interrupted());
    }

    #[test]
    fn timed_waits_expire() {
        let queue = BlockingQueue::with_initial(1, false, [1]).unwrap();
        let interrupt = Interrupt::new();

        let started = Instant::now();
        assert_eq!(
            queue.offer_timeout(2, Duration::from_millis(100), &interrupt),
            Err(OfferError::TimedOut(2))
        );
        assert!(started.elapsed() >= Duration::from_millis(100));

        let queue = BlockingQueue::<u32>::new(1).unwrap();
        assert_eq!(
            queue.poll_timeout(Duration::from_millis(100), &interrupt),
            Ok(None)
        );
    }

    #[test]
    fn maximum_timeout_remains_interruptible() {
        let queue = BlockingQueue::with_initial(1, false, [1]).unwrap();
        let interrupt = Interrupt::new();

        let producer = {
            let queue = queue.clone();
            let interrupt = interrupt.clone();
            thread::spawn(move || queue.offer_timeout(2, Duration::MAX, &interrupt))
        };

        thread::sleep(Duration::from_millis(150));
        interrupt.interrupt();

        assert_eq!(producer.join().unwrap(), Err(OfferError::Interrupted(2)));
    }

    #[test]
    fn drain_into_itself_is_rejected() {
        let queue = BlockingQueue::with_initial(4, false, [1, 2, 3]).unwrap();
        let mut same = queue.clone();

        assert_eq!(queue.drain_to(&mut same), Err(DrainError::SelfDrain));
        assert_eq!(queue.to_vec(), [1, 2, 3]);
    }

    #[test]
    fn limited_drain_moves_head_elements() {
        let queue = BlockingQueue::with_initial(9, false, 1..=9).unwrap();
        let mut sink = Vec::new();

        assert_eq!(queue.drain_to_limit(&mut sink, 4), Ok(4));
        assert_eq!(sink, [1, 2, 3, 4]);
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.to_vec(), [5, 6, 7, 8, 9]);

        assert_eq!(queue.drain_to_limit(&mut sink, 0), Ok(0));
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn drain_then_refill_restores_sequence() {
        let queue = BlockingQueue::with_initial(6, false, 1..=5).unwrap();
        let mut sink = Vec::new();

        queue.drain_to(&mut sink).unwrap();
        assert!(queue.is_empty());

        for &value in &sink {
            queue.offer(value).unwrap();
        }
        assert_eq!(queue.to_vec(), sink);
    }

    #[test]
    fn predicate_drain_keeps_relative_order() {
        let queue = BlockingQueue::with_initial(8, false, 1..=6).unwrap();
        let mut sink = Vec::new();

        assert_eq!(queue.drain_where(&mut sink, |v| v % 2 == 0), Ok(3));
        assert_eq!(sink, [2, 4, 6]);
        assert_eq!(queue.to_vec(), [1, 3, 5]);
        assert_eq!(queue.poll(), Some(1));
    }

    #[test]
    fn predicate_drain_handles_wrapped_window() {
        let queue = BlockingQueue::with_initial(4, false, [1, 2, 3, 4]).unwrap();
        queue.poll();
        queue.poll();
        queue.offer(5).unwrap();
        queue.offer(6).unwrap();

        let mut sink = Vec::new();
        assert_eq!(queue.drain_where(&mut sink, |v| v % 2 == 1), Ok(2));
        assert_eq!(sink, [3, 5]);
        assert_eq!(queue.to_vec(), [4, 6]);
    }

    #[test]
    fn full_destination_queue_stops_the_drain() {
        let source = BlockingQueue::with_initial(5, false, 1..=5).unwrap();
        let mut destination = BlockingQueue::new(3).unwrap();

        assert_eq!(
            source.drain_to(&mut destination),
            Err(DrainError::Refused { drained: 3 })
        );
        assert_eq!(destination.to_vec(), [1, 2, 3]);
        // the refused element went back to the head
        assert_eq!(source.to_vec(), [4, 5]);
    }

    #[test]
    fn drain_wakes_blocked_producers() {
        let queue = BlockingQueue::with_initial(2, true, [1, 2]).unwrap();

        let mut producers = Vec::new();
        for value in [3, 4] {
            let queue = queue.clone();
            producers.push(thread::spawn(move || {
                queue.put(value, &Interrupt::new()).unwrap();
            }));
            thread::sleep(Duration::from_millis(100));
        }

        let mut sink = Vec::new();
        assert_eq!(queue.drain_to(&mut sink), Ok(2));
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(sink, [1, 2]);
        // both freed slots were granted; simultaneously granted producers
        // enqueue in whichever order they re-acquire the lock
        let mut remaining = queue.to_vec();
        remaining.sort_unstable();
        assert_eq!(remaining, [3, 4]);
    }

    #[test]
    fn clear_discards_and_wakes() {
        let queue = BlockingQueue::with_initial(1, false, [9]).unwrap();

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.put(7, &Interrupt::new()).unwrap())
        };

        thread::sleep(Duration::from_millis(100));
        queue.clear();
        producer.join().unwrap();

        assert_eq!(queue.to_vec(), [7]);
    }

    #[test]
    fn dropping_the_queue_drops_buffered_elements() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Debug)]
        struct DropCounter(Arc<AtomicUsize>);

        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicUsize::new(0));

        {
            let queue = BlockingQueue::new(4).unwrap();
            for _ in 0..3 {
                queue.offer(DropCounter(dropped.clone())).unwrap();
            }
            queue.poll();
            assert_eq!(dropped.load(Ordering::SeqCst), 1);
        }

        assert_eq!(dropped.load(Ordering::SeqCst), 3);
    }
}
