//! Errors surfaced by queue construction, hand-off, and draining.
//!
//! Value-carrying errors hand the rejected element back to the caller, so a
//! failed operation never loses data and the queue is left exactly as it was
//! found. Those types implement `Debug`/`Display` by hand to avoid demanding
//! `T: Debug` from callers, the same way the standard channel errors do.

use std::fmt;

use thiserror::Error;

/// Rejected construction parameters.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConstructError {
    /// The requested capacity was zero.
    #[error("capacity must be positive")]
    InvalidCapacity,
    /// The seed collection holds more elements than the queue can.
    #[error("`collection` holds {len} elements but capacity is {capacity}")]
    CollectionTooLarge {
        /// Number of elements in the seed collection.
        len: usize,
        /// Requested queue capacity.
        capacity: usize,
    },
}

/// Error returned by [`add`](crate::BlockingQueue::add) on a full queue.
///
/// Holds the element that was not enqueued.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Returns the rejected element.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFull(..)")
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is full")
    }
}

impl<T> std::error::Error for QueueFull<T> {}

/// Error returned by [`remove`](crate::BlockingQueue::remove) on an empty queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("queue is empty")]
pub struct QueueEmpty;

/// A blocking wait was aborted by [`Interrupt::interrupt`](crate::Interrupt::interrupt).
///
/// For enqueue operations the payload is the element that was not enqueued;
/// for dequeue operations it is `()`. No element was produced or consumed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Interrupted<T = ()>(pub T);

impl<T> Interrupted<T> {
    /// Returns the element that was not enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Interrupted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupted(..)")
    }
}

impl<T> fmt::Display for Interrupted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("blocking wait interrupted")
    }
}

impl<T> std::error::Error for Interrupted<T> {}

/// Error returned by [`offer_timeout`](crate::BlockingQueue::offer_timeout).
///
/// Both variants hand the element back.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OfferError<T> {
    /// No slot became free before the deadline.
    TimedOut(T),
    /// The wait was interrupted.
    Interrupted(T),
}

impl<T> OfferError<T> {
    /// Returns the element that was not enqueued.
    pub fn into_inner(self) -> T {
        match self {
            OfferError::TimedOut(value) | OfferError::Interrupted(value) => value,
        }
    }
}

impl<T> fmt::Debug for OfferError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferError::TimedOut(_) => f.write_str("TimedOut(..)"),
            OfferError::Interrupted(_) => f.write_str("Interrupted(..)"),
        }
    }
}

impl<T> fmt::Display for OfferError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferError::TimedOut(_) => f.write_str("timed out waiting for a free slot"),
            OfferError::Interrupted(_) => f.write_str("blocking wait interrupted"),
        }
    }
}

impl<T> std::error::Error for OfferError<T> {}

/// Rejected or aborted drain.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DrainError {
    /// `collection` is the queue being drained; a queue cannot drain into itself.
    #[error("`collection` is the queue itself")]
    SelfDrain,
    /// The sink refused an element. The refused element was rolled back into
    /// the queue; `drained` elements had already been moved.
    #[error("sink refused an element after {drained} were drained")]
    Refused {
        /// Elements moved into the sink before the refusal.
        drained: usize,
    },
}
