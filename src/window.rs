// window[0] is always the oldest unacknowledged packet.

use crate::config::MAX_WINDOW;
use crate::reactor::TimerId;

#[derive(Debug, Clone)]
pub struct WindowSlot {
    pub seqno: u32,
    pub payload: Vec<u8>,
    pub retry_count: u32,
    pub timer: Option<TimerId>,
}

pub struct Window {
    slots: [Option<WindowSlot>; MAX_WINDOW],
    capacity: usize,
}

impl Window {
    pub fn new(capacity: usize) -> Window {
        assert!(capacity >= 1 && capacity <= MAX_WINDOW);
        const NONE: Option<WindowSlot> = None;
        Window {
            slots: [NONE; MAX_WINDOW],
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, i: usize) -> Option<&WindowSlot> {
        self.slots[..self.capacity][i].as_ref()
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut WindowSlot> {
        self.slots[..self.capacity][i].as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[..self.capacity].iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.slots[..self.capacity].iter().all(Option::is_some)
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.slots[..self.capacity].iter().position(Option::is_none)
    }

    pub fn put(&mut self, index: usize, slot: WindowSlot) {
        self.slots[index] = Some(slot);
    }

    pub fn take(&mut self, index: usize) -> Option<WindowSlot> {
        self.slots[index].take()
    }

    // Frees slot 0 and shifts the rest left by one; the vacated tail slot
    // is left empty for the sender's drain to refill.
    pub fn shift_left(&mut self) {
        for i in 0..self.capacity - 1 {
            self.slots[i] = self.slots[i + 1].take();
        }
        self.slots[self.capacity - 1] = None;
    }

    // Occupied slots must form a contiguous, increasing-by-one block from
    // index 0, each carrying a live timer. No-op outside debug builds.
    pub fn debug_assert_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let mut prev_seq: Option<u32> = None;
        let mut seen_gap = false;
        for i in 0..self.capacity {
            match self.slots[i].as_ref() {
                Some(slot) => {
                    debug_assert!(!seen_gap, "window has a hole before slot {i}");
                    if let Some(prev) = prev_seq {
                        debug_assert_eq!(
                            slot.seqno,
                            prev.wrapping_add(1),
                            "window slot {i} breaks sequence contiguity"
                        );
                    }
                    debug_assert!(slot.timer.is_some(), "occupied window slot {i} has no timer");
                    prev_seq = Some(slot.seqno);
                }
                None => seen_gap = true,
            }
        }
    }
}
