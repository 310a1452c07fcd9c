//! Cooperative interruption of blocking waits.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::flag::AtomicFlag;
use crate::queue::waiters::WaitCoordinator;

/// A cooperative cancellation token for blocking queue operations.
///
/// Every blocking operation ([`put`](crate::BlockingQueue::put),
/// [`take`](crate::BlockingQueue::take),
/// [`offer_timeout`](crate::BlockingQueue::offer_timeout),
/// [`poll_timeout`](crate::BlockingQueue::poll_timeout)) takes a token.
/// Raising it with [`interrupt`](Interrupt::interrupt) aborts any wait in
/// progress under the token with
/// [`Interrupted`](crate::Interrupted), with no element produced or consumed.
///
/// The token stays raised after delivery — later blocking calls with the same
/// token abort immediately — until [`clear`](Interrupt::clear) resets it.
/// Clones share the same flag, so one half of a pair can be handed to the
/// thread that will do the interrupting.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use std::time::Duration;
/// use weir::{BlockingQueue, Interrupt, Interrupted};
///
/// let queue = BlockingQueue::<u32>::new(1).unwrap();
/// let interrupt = Interrupt::new();
///
/// let waiter = {
///     let queue = queue.clone();
///     let interrupt = interrupt.clone();
///     thread::spawn(move || queue.take(&interrupt))
/// };
///
/// thread::sleep(Duration::from_millis(50));
/// interrupt.interrupt();
/// assert_eq!(waiter.join().unwrap(), Err(Interrupted(())));
/// ```
#[derive(Clone, Default)]
pub struct Interrupt {
    state: Arc<State>,
}

#[derive(Default)]
struct State {
    raised: AtomicFlag,
    /// Coordinators with a wait in progress under this token.
    targets: Mutex<Vec<Weak<WaitCoordinator>>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the token and wakes every wait in progress under it.
    pub fn interrupt(&self) {
        self.state.raised.set(true);

        // Snapshot under the registry lock, wake after releasing it: waking
        // takes each coordinator's own lock, which attach/detach callers hold
        // while touching the registry.
        let targets: Vec<Arc<WaitCoordinator>> = {
            let targets = self.state.targets.lock();
            targets.iter().filter_map(Weak::upgrade).collect()
        };

        for coordinator in targets {
            coordinator.wake_all();
        }
    }

    /// Whether the token is raised.
    pub fn is_interrupted(&self) -> bool {
        self.state.raised.get()
    }

    /// Lowers the token so blocking operations can wait again.
    pub fn clear(&self) {
        self.state.raised.set(false);
    }

    /// Registers a wait in progress. The coordinator stays registered until
    /// the returned guard drops.
    pub(crate) fn attach(&self, coordinator: &Arc<WaitCoordinator>) -> Attached<'_> {
        let target = Arc::downgrade(coordinator);
        self.state.targets.lock().push(target.clone());
        Attached { state: &self.state, target }
    }
}

impl std::fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupt")
            .field("raised", &self.is_interrupted())
            .finish()
    }
}

/// Deregisters one wait on drop.
pub(crate) struct Attached<'a> {
    state: &'a State,
    target: Weak<WaitCoordinator>,
}

impl Drop for Attached<'_> {
    fn drop(&mut self) {
        let mut targets = self.state.targets.lock();
        if let Some(at) = targets.iter().position(|t| t.ptr_eq(&self.target)) {
            targets.swap_remove(at);
        }
    }
}
