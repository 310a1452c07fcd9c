/// Fixed-capacity circular storage.
///
/// Elements live in `items[take_index]`, `items[take_index + 1]`, … (mod
/// capacity) for `count` positions. Slots outside that window are `None`;
/// a removed slot is cleared immediately so the queue never extends an
/// element's lifetime past its logical removal.
///
/// Not synchronized. [`BlockingQueue`](crate::BlockingQueue) keeps exactly
/// one of these behind its mutex.
pub(crate) struct RingBuffer<T> {
    items: Box<[Option<T>]>,
    take_index: usize,
    put_index: usize,
    count: usize,
}

impl<T> RingBuffer<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0);

        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, || None);

        Self {
            items: items.into_boxed_slice(),
            take_index: 0,
            put_index: 0,
            count: 0,
        }
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline(always)]
    pub(crate) fn is_full(&self) -> bool {
        self.count == self.items.len()
    }

    #[inline(always)]
    fn advance(&self, index: usize) -> usize {
        if index + 1 == self.items.len() { 0 } else { index + 1 }
    }

    #[inline(always)]
    fn retreat(&self, index: usize) -> usize {
        if index == 0 { self.items.len() - 1 } else { index - 1 }
    }

    /// Stores `value` at `put_index`. Caller has checked the queue is not full.
    pub(crate) fn enqueue(&mut self, value: T) {
        debug_assert!(!self.is_full());

        self.items[self.put_index] = Some(value);
        self.put_index = self.advance(self.put_index);
        self.count += 1;
    }

    /// Removes and returns the element at `take_index`, clearing its slot.
    pub(crate) fn dequeue(&mut self) -> Option<T> {
        let value = self.items[self.take_index].take()?;
        self.take_index = self.advance(self.take_index);
        self.count -= 1;
        Some(value)
    }

    /// Reinstates `value` as the head element, undoing a dequeue.
    pub(crate) fn push_front(&mut self, value: T) {
        debug_assert!(!self.is_full());

        self.take_index = self.retreat(self.take_index);
        self.items[self.take_index] = Some(value);
        self.count += 1;
    }

    pub(crate) fn peek(&self) -> Option<&T> {
        self.items[self.take_index].as_ref()
    }

    /// Elements of the live window in take-order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).filter_map(move |offset| {
            self.items[(self.take_index + offset) % self.items.len()].as_ref()
        })
    }

    /// Drops every element. Returns the number of slots freed.
    pub(crate) fn clear(&mut self) -> usize {
        let freed = self.count;
        for slot in self.items.iter_mut() {
            *slot = None;
        }
        self.take_index = 0;
        self.put_index = 0;
        self.count = 0;
        freed
    }

    /// Removes each element for which `matches` holds, feeding it to `accept`,
    /// and compacts the survivors toward `take_index` so their relative order
    /// is preserved.
    ///
    /// If `accept` hands an element back, draining stops: the refused element
    /// stays in the queue and every remaining element is retained. Returns the
    /// number of elements accepted and whether a refusal occurred.
    pub(crate) fn drain_matching(
        &mut self,
        mut matches: impl FnMut(&T) -> bool,
        mut accept: impl FnMut(T) -> Result<(), T>,
    ) -> (usize, bool) {
        let original = self.count;
        let mut read = self.take_index;
        let mut write = self.take_index;
        let mut moved = 0;
        let mut refused = false;

        for _ in 0..original {
            let Some(value) = self.items[read].take() else {
                break;
            };
            read = self.advance(read);

            if !refused && matches(&value) {
                match accept(value) {
                    Ok(()) => {
                        moved += 1;
                        continue;
                    }
                    Err(value) => {
                        refused = true;
                        self.items[write] = Some(value);
                        write = self.advance(write);
                    }
                }
            } else {
                self.items[write] = Some(value);
                write = self.advance(write);
            }
        }

        self.count -= moved;
        self.put_index = write;
        (moved, refused)
    }
}
