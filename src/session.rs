use std::collections::HashMap;
use std::net::SocketAddr;

use crate::receiver::ReceiverHalf;
use crate::sender::SenderHalf;

#[derive(Default)]
pub struct Session {
    pub sender: Option<SenderHalf>,
    pub receiver: Option<ReceiverHalf>,
}

impl Session {
    pub fn fully_finished(&self) -> bool {
        self.sender.as_ref().map_or(true, |s| s.finished())
            && self.receiver.as_ref().map_or(true, |r| r.finished())
    }
}

#[derive(Default)]
pub struct SessionTable {
    sessions: HashMap<SocketAddr, Session>,
}

impl SessionTable {
    pub fn new() -> SessionTable {
        SessionTable::default()
    }

    pub fn find(&self, addr: SocketAddr) -> Option<&Session> {
        self.sessions.get(&addr)
    }

    pub fn find_mut(&mut self, addr: SocketAddr) -> Option<&mut Session> {
        self.sessions.get_mut(&addr)
    }

    pub fn get_or_insert(&mut self, addr: SocketAddr) -> &mut Session {
        self.sessions.entry(addr).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SocketAddr, &Session)> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SocketAddr, &mut Session)> {
        self.sessions.iter_mut()
    }

    pub fn all_finished(&self) -> bool {
        self.sessions.values().all(Session::fully_finished)
    }
}
