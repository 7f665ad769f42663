use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_packet_size: usize,
    pub window: usize,
    pub timeout: Duration,
    pub max_retransmissions: u32,
}

// Backs the sender's fixed-size slot array; Config::window is bounds-checked against it.
pub const MAX_WINDOW: usize = 16;

impl Default for Config {
    fn default() -> Self {
        Config {
            max_packet_size: 1000,
            window: 3,
            timeout: Duration::from_millis(500),
            max_retransmissions: 5,
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) {
        assert!(self.window >= 1 && self.window <= MAX_WINDOW);
        assert!(self.max_packet_size <= crate::wire::MAXPKTSIZE);
    }
}
