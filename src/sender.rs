use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, warn};

use crate::effect::{Effect, RudpEvent};
use crate::reactor::TimerId;
use crate::window::{Window, WindowSlot};
use crate::wire::{Packet, PacketKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    SynSent,
    Open,
    FinSent,
    Done,
}

pub enum SenderEvent {
    Ack(u32),
    SynTimerFired,
    FinTimerFired,
    SlotTimerFired(usize),
}

pub struct SenderHalf {
    state: SenderState,
    next_seq: u32,
    window: Window,
    pending_queue: VecDeque<Vec<u8>>,
    syn_timer: Option<TimerId>,
    fin_timer: Option<TimerId>,
    syn_retries: u32,
    fin_retries: u32,
    fin_seq: u32,
    finished: bool,
    timed_out: bool,
    close_requested: bool,
    max_retransmissions: u32,
    timeout: Duration,
}

impl SenderHalf {
    pub fn open(
        syn_seq: u32,
        window_size: usize,
        timeout: Duration,
        max_retransmissions: u32,
        first_datum: Vec<u8>,
    ) -> (SenderHalf, Vec<Effect>) {
        let mut half = SenderHalf {
            state: SenderState::SynSent,
            next_seq: syn_seq,
            window: Window::new(window_size),
            pending_queue: VecDeque::new(),
            syn_timer: None,
            fin_timer: None,
            syn_retries: 0,
            fin_retries: 0,
            fin_seq: 0,
            finished: false,
            timed_out: false,
            close_requested: false,
            max_retransmissions,
            timeout,
        };
        half.pending_queue.push_back(first_datum);
        let effects = vec![
            Effect::Send(Packet::control(PacketKind::Syn, syn_seq)),
            Effect::ArmSynTimer(timeout),
        ];
        debug!("sender: SYN({}) sent, SYN_SENT", syn_seq);
        (half, effects)
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn set_syn_timer(&mut self, id: TimerId) {
        self.syn_timer = Some(id);
    }

    pub fn set_fin_timer(&mut self, id: TimerId) {
        self.fin_timer = Some(id);
    }

    pub fn set_slot_timer(&mut self, index: usize, id: TimerId) {
        if let Some(slot) = self.window.get_mut(index) {
            slot.timer = Some(id);
        }
    }

    // Run after a dispatch step's effects are all carried out (slot timers
    // assigned via set_slot_timer included). No-op outside debug builds.
    pub fn debug_assert_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        self.window.debug_assert_invariants();
        if !self.pending_queue.is_empty() {
            debug_assert!(
                self.window.is_full() || self.state != SenderState::Open,
                "pending_queue non-empty with room in an OPEN window"
            );
        }
    }

    pub fn queue_send(&mut self, data: Vec<u8>) -> Vec<Effect> {
        self.pending_queue.push_back(data);
        if self.state == SenderState::Open {
            self.drain()
        } else {
            Vec::new()
        }
    }

    pub fn request_close(&mut self) -> Vec<Effect> {
        self.close_requested = true;
        self.try_emit_fin()
    }

    pub fn on_event(&mut self, event: SenderEvent) -> Vec<Effect> {
        match event {
            SenderEvent::Ack(seqno) => self.on_ack(seqno),
            SenderEvent::SynTimerFired => self.on_syn_timer(),
            SenderEvent::FinTimerFired => self.on_fin_timer(),
            SenderEvent::SlotTimerFired(i) => self.on_slot_timer(i),
        }
    }

    fn on_ack(&mut self, seqno: u32) -> Vec<Effect> {
        match self.state {
            SenderState::SynSent => {
                if seqno != self.next_seq.wrapping_add(1) {
                    return Vec::new();
                }
                let mut effects = Vec::new();
                if let Some(id) = self.syn_timer.take() {
                    effects.push(Effect::Cancel(id));
                }
                self.state = SenderState::Open;
                debug!("sender: SYN acked, -> OPEN");
                effects.extend(self.drain());
                effects.extend(self.try_emit_fin());
                effects
            }
            SenderState::Open => {
                let expected = match self.window.get(0) {
                    Some(slot) => slot.seqno.wrapping_add(1),
                    None => return Vec::new(),
                };
                if seqno != expected {
                    return Vec::new();
                }
                let mut effects = Vec::new();
                if let Some(id) = self.window.get(0).and_then(|s| s.timer) {
                    effects.push(Effect::Cancel(id));
                }
                self.window.shift_left();
                effects.extend(self.drain());
                effects.extend(self.try_emit_fin());
                effects
            }
            SenderState::FinSent => {
                if seqno != self.fin_seq.wrapping_add(1) {
                    return Vec::new();
                }
                let mut effects = Vec::new();
                if let Some(id) = self.fin_timer.take() {
                    effects.push(Effect::Cancel(id));
                }
                self.finished = true;
                self.state = SenderState::Done;
                debug!("sender: FIN acked, -> DONE");
                effects
            }
            SenderState::Done => Vec::new(),
        }
    }

    fn on_syn_timer(&mut self) -> Vec<Effect> {
        if self.state != SenderState::SynSent {
            return Vec::new();
        }
        self.syn_timer = None;
        if self.syn_retries < self.max_retransmissions {
            self.syn_retries += 1;
            warn!("sender: SYN({}) timeout, retry {}", self.next_seq, self.syn_retries);
            vec![
                Effect::Send(Packet::control(PacketKind::Syn, self.next_seq)),
                Effect::ArmSynTimer(self.timeout),
            ]
        } else {
            self.timed_out = true;
            vec![Effect::Notify(RudpEvent::Timeout)]
        }
    }

    fn on_fin_timer(&mut self) -> Vec<Effect> {
        if self.state != SenderState::FinSent {
            return Vec::new();
        }
        self.fin_timer = None;
        if self.fin_retries < self.max_retransmissions {
            self.fin_retries += 1;
            warn!("sender: FIN({}) timeout, retry {}", self.fin_seq, self.fin_retries);
            vec![
                Effect::Send(Packet::control(PacketKind::Fin, self.fin_seq)),
                Effect::ArmFinTimer(self.timeout),
            ]
        } else {
            self.timed_out = true;
            vec![Effect::Notify(RudpEvent::Timeout)]
        }
    }

    fn on_slot_timer(&mut self, index: usize) -> Vec<Effect> {
        let Some(slot) = self.window.get_mut(index) else {
            return Vec::new();
        };
        slot.timer = None;
        if slot.retry_count < self.max_retransmissions {
            slot.retry_count += 1;
            let packet = Packet::data(slot.seqno, slot.payload.clone());
            warn!("sender: DATA({}) timeout, retry {}", slot.seqno, slot.retry_count);
            vec![Effect::Send(packet), Effect::ArmSlotTimer(index, self.timeout)]
        } else {
            self.timed_out = true;
            vec![Effect::Notify(RudpEvent::Timeout)]
        }
    }

    fn drain(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Some(index) = self.window.first_empty() {
            let Some(data) = self.pending_queue.pop_front() else {
                break;
            };
            self.next_seq = self.next_seq.wrapping_add(1);
            let seqno = self.next_seq;
            effects.push(Effect::Send(Packet::data(seqno, data.clone())));
            effects.push(Effect::ArmSlotTimer(index, self.timeout));
            self.window.put(
                index,
                WindowSlot {
                    seqno,
                    payload: data,
                    retry_count: 0,
                    timer: None,
                },
            );
        }
        effects
    }

    fn try_emit_fin(&mut self) -> Vec<Effect> {
        if !self.close_requested
            || self.state != SenderState::Open
            || !self.pending_queue.is_empty()
            || !self.window.is_empty()
        {
            return Vec::new();
        }
        self.fin_seq = self.next_seq.wrapping_add(1);
        self.next_seq = self.fin_seq;
        self.state = SenderState::FinSent;
        debug!("sender: FIN({}) sent, -> FIN_SENT", self.fin_seq);
        vec![
            Effect::Send(Packet::control(PacketKind::Fin, self.fin_seq)),
            Effect::ArmFinTimer(self.timeout),
        ]
    }
}
