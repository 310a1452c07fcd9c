//! Bulk transfer out of the queue into an external sink.

use std::collections::VecDeque;

use crate::error::DrainError;

use super::ring::RingBuffer;

/// Destination for drained elements.
///
/// A sink accepts elements one at a time. Returning `Err` hands the element
/// back and aborts the drain; the queue rolls the element back so nothing is
/// lost. `accept` runs under the draining queue's mutex, so it must not block
/// or call back into that queue.
///
/// Implemented for `Vec`, `VecDeque`, and [`BlockingQueue`](crate::BlockingQueue)
/// itself (where accepting is a non-blocking offer, refused when the
/// destination is full). Draining a queue into itself is rejected with
/// [`DrainError::SelfDrain`] before any element moves.
pub trait Sink<T> {
    /// Accepts one element, or hands it back.
    fn accept(&mut self, value: T) -> Result<(), T>;

    /// Stable address of the backing queue when the sink is itself a queue.
    ///
    /// Used to reject draining a queue into itself. Sinks that are not queues
    /// keep the default `None`.
    fn queue_addr(&self) -> Option<usize> {
        None
    }
}

impl<T> Sink<T> for Vec<T> {
    fn accept(&mut self, value: T) -> Result<(), T> {
        self.push(value);
        Ok(())
    }
}

impl<T> Sink<T> for VecDeque<T> {
    fn accept(&mut self, value: T) -> Result<(), T> {
        self.push_back(value);
        Ok(())
    }
}

/// One drain call's policy: the sink, the element budget, and the running
/// tally. Lives entirely inside the queue's critical section.
pub(crate) struct Drainer<'a, S: ?Sized> {
    sink: &'a mut S,
    max: usize,
    moved: usize,
}

impl<'a, S: ?Sized> Drainer<'a, S> {
    pub(crate) fn new(sink: &'a mut S, max: usize) -> Self {
        Self { sink, max, moved: 0 }
    }

    /// Moves up to `max` elements off the head of `ring` in take-order.
    ///
    /// On refusal the in-flight element goes back to the head and the error
    /// reports how many elements had already moved.
    pub(crate) fn drain_head<T>(&mut self, ring: &mut RingBuffer<T>) -> Result<usize, DrainError>
    where
        S: Sink<T>,
    {
        while self.moved < self.max {
            let Some(value) = ring.dequeue() else {
                break;
            };
            match self.sink.accept(value) {
                Ok(()) => self.moved += 1,
                Err(value) => {
                    ring.push_front(value);
                    return Err(DrainError::Refused { drained: self.moved });
                }
            }
        }
        Ok(self.moved)
    }

    /// Moves every element matching `matches`, closing the gaps so retained
    /// elements keep their relative order.
    pub(crate) fn drain_matching<T>(
        &mut self,
        ring: &mut RingBuffer<T>,
        matches: impl FnMut(&T) -> bool,
    ) -> Result<usize, DrainError>
    where
        S: Sink<T>,
    {
        let (moved, refused) = ring.drain_matching(matches, |value| self.sink.accept(value));
        self.moved = moved;
        if refused {
            Err(DrainError::Refused { drained: moved })
        } else {
            Ok(moved)
        }
    }

    /// Elements accepted so far; the number of slots the drain freed.
    pub(crate) fn freed(&self) -> usize {
        self.moved
    }
}
