use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::{info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::config::Config;
use crate::effect::{Effect, RudpEvent};
use crate::error::RudpError;
use crate::io::{DatagramIo, UdpTransport};
use crate::reactor::{PollReactor, TimerId};
use crate::receiver::ReceiverHalf;
use crate::sender::{SenderEvent, SenderHalf};
use crate::session::SessionTable;
use crate::wire::{Packet, PacketKind};

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Syn,
    Fin,
    Slot(usize),
}

struct TimerTarget {
    addr: SocketAddr,
    kind: TimerKind,
}

pub struct Endpoint {
    transport: UdpTransport,
    reactor: PollReactor,
    sessions: SessionTable,
    timer_targets: HashMap<TimerId, TimerTarget>,
    data_callback: Option<Box<dyn FnMut(SocketAddr, &[u8]) + Send>>,
    event_callback: Option<Box<dyn FnMut(RudpEvent, SocketAddr) + Send>>,
    close_requested: bool,
    closed: bool,
    config: Config,
    local_addr: SocketAddr,
    rng: StdRng,
}

impl Endpoint {
    pub fn open(config: Config, local_port: u16) -> io::Result<Endpoint> {
        Endpoint::open_with_rng(config, local_port, rand::thread_rng())
    }

    pub fn open_with_rng(
        config: Config,
        local_port: u16,
        mut rng: impl RngCore,
    ) -> io::Result<Endpoint> {
        config.validate();
        let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), local_port);
        let transport = UdpTransport::bind(bind_addr)?;
        let local_addr = transport.local_addr()?;
        let reactor = PollReactor::new(transport.raw_fd());
        info!("endpoint opened on {}", local_addr);
        Ok(Endpoint {
            transport,
            reactor,
            sessions: SessionTable::new(),
            timer_targets: HashMap::new(),
            data_callback: None,
            event_callback: None,
            close_requested: false,
            closed: false,
            config,
            local_addr,
            rng: StdRng::from_rng(&mut rng).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn register_data_callback(&mut self, cb: impl FnMut(SocketAddr, &[u8]) + Send + 'static) {
        self.data_callback = Some(Box::new(cb));
    }

    pub fn register_event_callback(
        &mut self,
        cb: impl FnMut(RudpEvent, SocketAddr) + Send + 'static,
    ) {
        self.event_callback = Some(Box::new(cb));
    }

    pub fn send(&mut self, data: &[u8], peer: SocketAddr) -> Result<(), RudpError> {
        if data.len() > self.config.max_packet_size {
            return Err(RudpError::PayloadTooLarge {
                len: data.len(),
                max: self.config.max_packet_size,
            });
        }
        let window = self.config.window;
        let timeout = self.config.timeout;
        let max_retransmissions = self.config.max_retransmissions;
        let effects = {
            let session = self.sessions.get_or_insert(peer);
            match session.sender.as_mut() {
                Some(sender) => sender.queue_send(data.to_vec()),
                None => {
                    let syn_seq: u32 = self.rng.gen();
                    let (half, effects) =
                        SenderHalf::open(syn_seq, window, timeout, max_retransmissions, data.to_vec());
                    session.sender = Some(half);
                    effects
                }
            }
        };
        self.apply_effects(peer, effects);
        Ok(())
    }

    pub fn close(&mut self) {
        self.close_requested = true;
        let addrs: Vec<SocketAddr> = self.sessions.iter().map(|(a, _)| *a).collect();
        for addr in addrs {
            let effects = match self.sessions.find_mut(addr).and_then(|s| s.sender.as_mut()) {
                Some(sender) => sender.request_close(),
                None => Vec::new(),
            };
            self.apply_effects(addr, effects);
        }
        self.maybe_close();
    }

    // Blocks until close() has been called and every session's halves
    // finish; otherwise the socket/timers keep the loop alive indefinitely.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            if self.closed {
                return Ok(());
            }
            let readable = self
                .reactor
                .wait()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            if readable {
                self.drain_socket();
            }
            self.fire_expired_timers();
        }
    }

    fn drain_socket(&mut self) {
        let mut buf = [0u8; crate::wire::PACKET_LEN];
        loop {
            match self.transport.recv_from(&mut buf) {
                Ok((n, addr)) => self.dispatch_datagram(addr, &buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("recv_from failed: {}", e);
                    break;
                }
            }
        }
    }

    fn dispatch_datagram(&mut self, addr: SocketAddr, bytes: &[u8]) {
        let packet = match Packet::decode(bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!("discarding malformed datagram from {}: {}", addr, e);
                return;
            }
        };
        trace!("recv {} seq={} from {}", packet.kind, packet.seqno, addr);
        match packet.kind {
            PacketKind::Syn => self.on_syn(addr, packet.seqno),
            PacketKind::Data => self.on_data(addr, packet.seqno, packet.payload),
            PacketKind::Fin => self.on_fin(addr, packet.seqno),
            PacketKind::Ack => self.on_ack(addr, packet.seqno),
        }
        self.maybe_close();
    }

    fn on_syn(&mut self, addr: SocketAddr, seqno: u32) {
        let window = self.config.window;
        let effects = {
            let session = self.sessions.get_or_insert(addr);
            match session.receiver.as_mut() {
                Some(receiver) => receiver.on_syn(seqno),
                None => {
                    let (half, effects) = ReceiverHalf::open(seqno, window);
                    session.receiver = Some(half);
                    effects
                }
            }
        };
        self.apply_effects(addr, effects);
    }

    fn on_data(&mut self, addr: SocketAddr, seqno: u32, payload: Vec<u8>) {
        let effects = match self.sessions.find_mut(addr).and_then(|s| s.receiver.as_mut()) {
            Some(receiver) => receiver.on_data(seqno, payload),
            None => {
                warn!("discarding DATA({}) from {} with no receiver session", seqno, addr);
                Vec::new()
            }
        };
        self.apply_effects(addr, effects);
    }

    fn on_fin(&mut self, addr: SocketAddr, seqno: u32) {
        let effects = match self.sessions.find_mut(addr).and_then(|s| s.receiver.as_mut()) {
            Some(receiver) => receiver.on_fin(seqno),
            None => Vec::new(),
        };
        self.apply_effects(addr, effects);
    }

    fn on_ack(&mut self, addr: SocketAddr, seqno: u32) {
        let effects = match self.sessions.find_mut(addr).and_then(|s| s.sender.as_mut()) {
            Some(sender) => sender.on_event(SenderEvent::Ack(seqno)),
            None => {
                warn!("discarding unsolicited ACK({}) from {}", seqno, addr);
                Vec::new()
            }
        };
        self.apply_effects(addr, effects);
    }

    fn fire_expired_timers(&mut self) {
        let fired = self.reactor.timers.expired();
        for id in fired {
            let Some(target) = self.timer_targets.remove(&id) else {
                continue;
            };
            let event = match target.kind {
                TimerKind::Syn => SenderEvent::SynTimerFired,
                TimerKind::Fin => SenderEvent::FinTimerFired,
                TimerKind::Slot(i) => SenderEvent::SlotTimerFired(i),
            };
            let effects = match self.sessions.find_mut(target.addr).and_then(|s| s.sender.as_mut()) {
                Some(sender) => sender.on_event(event),
                None => Vec::new(),
            };
            self.apply_effects(target.addr, effects);
        }
        self.maybe_close();
    }

    fn apply_effects(&mut self, addr: SocketAddr, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(packet) => self.send_packet(addr, &packet),
                Effect::ArmSynTimer(dur) => self.arm(addr, TimerKind::Syn, dur),
                Effect::ArmFinTimer(dur) => self.arm(addr, TimerKind::Fin, dur),
                Effect::ArmSlotTimer(idx, dur) => self.arm(addr, TimerKind::Slot(idx), dur),
                Effect::Cancel(id) => {
                    self.reactor.timers.cancel(id);
                    self.timer_targets.remove(&id);
                }
                Effect::Deliver(payload) => {
                    if let Some(cb) = self.data_callback.as_mut() {
                        cb(addr, &payload);
                    }
                }
                Effect::Notify(event) => self.notify(addr, event),
            }
        }
        if let Some(sender) = self.sessions.find(addr).and_then(|s| s.sender.as_ref()) {
            sender.debug_assert_invariants();
        }
    }

    fn arm(&mut self, addr: SocketAddr, kind: TimerKind, dur: Duration) {
        let id = self.reactor.timers.schedule(dur);
        self.timer_targets.insert(id, TimerTarget { addr, kind });
        if let Some(sender) = self.sessions.find_mut(addr).and_then(|s| s.sender.as_mut()) {
            match kind {
                TimerKind::Syn => sender.set_syn_timer(id),
                TimerKind::Fin => sender.set_fin_timer(id),
                TimerKind::Slot(i) => sender.set_slot_timer(i, id),
            }
        }
    }

    fn send_packet(&mut self, addr: SocketAddr, packet: &Packet) {
        let buf = packet.encode();
        match self.transport.send_to(&buf, addr) {
            Ok(_) => trace!("sent {} seq={} to {}", packet.kind, packet.seqno, addr),
            Err(e) => warn!("send to {} failed, treated as wire loss: {}", addr, e),
        }
    }

    fn notify(&mut self, addr: SocketAddr, event: RudpEvent) {
        if event == RudpEvent::Timeout {
            info!("TIMEOUT for session {}", addr);
        }
        if let Some(cb) = self.event_callback.as_mut() {
            cb(event, addr);
        }
    }

    fn maybe_close(&mut self) {
        if self.closed || !self.close_requested {
            return;
        }
        if self.sessions.all_finished() {
            self.closed = true;
            info!("endpoint on {} closed", self.local_addr);
            let local_addr = self.local_addr;
            if let Some(cb) = self.event_callback.as_mut() {
                cb(RudpEvent::Closed, local_addr);
            }
        }
    }
}
