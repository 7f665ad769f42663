use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

use nix::poll::{poll, PollFd, PollFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct TimerEntry {
    deadline: Instant,
    live: bool,
}

// Cancel doesn't touch the heap, it just flips `live` in the side table;
// pop_dead discards dead entries lazily as they surface.
pub struct TimerWheel {
    heap: BinaryHeap<Reverse<(Instant, TimerId)>>,
    entries: HashMap<TimerId, TimerEntry>,
    next_id: u64,
}

impl TimerWheel {
    pub fn new() -> TimerWheel {
        TimerWheel {
            heap: BinaryHeap::new(),
            entries: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = Instant::now() + delay;
        self.heap.push(Reverse((deadline, id)));
        self.entries.insert(id, TimerEntry { deadline, live: true });
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.live = false;
        }
    }

    fn pop_dead(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            match self.entries.get(id) {
                Some(entry) if entry.live => break,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }

    pub fn expired(&mut self) -> Vec<TimerId> {
        let now = Instant::now();
        let mut fired = Vec::new();
        loop {
            self.pop_dead();
            match self.heap.peek() {
                Some(Reverse((deadline, _))) if *deadline <= now => {
                    let Reverse((_, id)) = self.heap.pop().unwrap();
                    self.entries.remove(&id);
                    fired.push(id);
                }
                _ => break,
            }
        }
        fired
    }

    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.pop_dead();
        self.heap.peek().map(|Reverse((deadline, _))| *deadline)
    }
}

pub struct PollReactor {
    fd: RawFd,
    pub timers: TimerWheel,
}

impl PollReactor {
    pub fn new(fd: RawFd) -> PollReactor {
        PollReactor {
            fd,
            timers: TimerWheel::new(),
        }
    }

    pub fn wait(&mut self) -> nix::Result<bool> {
        let timeout_ms = match self.timers.next_deadline() {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    0
                } else {
                    (deadline - now).as_millis().min(i32::MAX as u128) as i32
                }
            }
            None => -1,
        };
        let mut fds = [PollFd::new(self.fd, PollFlags::POLLIN)];
        let n = poll(&mut fds, timeout_ms)?;
        if n <= 0 {
            return Ok(false);
        }
        let revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
        Ok(revents.contains(PollFlags::POLLIN))
    }
}
