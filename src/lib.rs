#![doc = include_str!("../README.md")]

#[allow(unused_imports)]
#[cfg(not(feature = "loom"))]
pub(crate) use std::{sync::atomic, thread};

#[allow(unused_imports)]
#[cfg(feature = "loom")]
pub(crate) use loom::{sync::atomic, thread};

mod counter;
mod error;
mod flag;
mod interrupt;
pub mod queue;

pub use counter::AtomicCounter;
pub use error::{ConstructError, DrainError, Interrupted, OfferError, QueueEmpty, QueueFull};
pub use flag::AtomicFlag;
pub use interrupt::Interrupt;
pub use queue::{BlockingQueue, Iter, Sink};
