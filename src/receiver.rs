use log::debug;

use crate::effect::Effect;
use crate::seq;
use crate::wire::{Packet, PacketKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Opening,
    Open,
    Done,
}

pub struct ReceiverHalf {
    state: ReceiverState,
    expected_seq: u32,
    finished: bool,
    recovery_window: u32,
}

impl ReceiverHalf {
    pub fn open(syn_seq: u32, recovery_window: usize) -> (ReceiverHalf, Vec<Effect>) {
        let expected_seq = syn_seq.wrapping_add(1);
        let half = ReceiverHalf {
            state: ReceiverState::Opening,
            expected_seq,
            finished: false,
            recovery_window: recovery_window as u32,
        };
        debug!("receiver: SYN({}) accepted, expecting {}", syn_seq, expected_seq);
        let effects = vec![Effect::Send(Packet::control(PacketKind::Ack, expected_seq))];
        (half, effects)
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn on_syn(&mut self, syn_seq: u32) -> Vec<Effect> {
        match self.state {
            ReceiverState::Opening => {
                vec![Effect::Send(Packet::control(PacketKind::Ack, self.expected_seq))]
            }
            ReceiverState::Open | ReceiverState::Done => {
                debug!("receiver: duplicate SYN({}) while {:?}, discarded", syn_seq, self.state);
                Vec::new()
            }
        }
    }

    pub fn on_data(&mut self, seqno: u32, payload: Vec<u8>) -> Vec<Effect> {
        match self.state {
            ReceiverState::Opening | ReceiverState::Open => {
                if seqno == self.expected_seq {
                    let ack_seq = self.expected_seq.wrapping_add(1);
                    self.expected_seq = ack_seq;
                    self.state = ReceiverState::Open;
                    vec![
                        Effect::Send(Packet::control(PacketKind::Ack, ack_seq)),
                        Effect::Deliver(payload),
                    ]
                } else if self.state == ReceiverState::Open && self.in_recovery_window(seqno) {
                    debug!("receiver: duplicate DATA({}) re-acked, not delivered", seqno);
                    vec![Effect::Send(Packet::control(
                        PacketKind::Ack,
                        seqno.wrapping_add(1),
                    ))]
                } else {
                    Vec::new()
                }
            }
            ReceiverState::Done => Vec::new(),
        }
    }

    pub fn on_fin(&mut self, seqno: u32) -> Vec<Effect> {
        match self.state {
            ReceiverState::Open if seqno == self.expected_seq => {
                let ack_seq = self.expected_seq.wrapping_add(1);
                self.finished = true;
                self.state = ReceiverState::Done;
                debug!("receiver: FIN({}) accepted, -> DONE", seqno);
                vec![Effect::Send(Packet::control(PacketKind::Ack, ack_seq))]
            }
            _ => Vec::new(),
        }
    }

    fn in_recovery_window(&self, seqno: u32) -> bool {
        let floor = self.expected_seq.wrapping_sub(self.recovery_window);
        seq::geq(seqno, floor) && seq::lt(seqno, self.expected_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syn_opens_and_acks() {
        let (half, effects) = ReceiverHalf::open(1000, 3);
        assert_eq!(half.state(), ReceiverState::Opening);
        assert!(matches!(effects[0], Effect::Send(ref p) if p.kind == PacketKind::Ack && p.seqno == 1001));
    }

    #[test]
    fn in_order_data_delivers_and_advances() {
        let (mut half, _) = ReceiverHalf::open(1000, 3);
        let effects = half.on_data(1001, b"hi".to_vec());
        assert_eq!(half.state(), ReceiverState::Open);
        assert!(effects.iter().any(|e| matches!(e, Effect::Deliver(p) if p == b"hi")));
        assert!(effects.iter().any(|e| matches!(e, Effect::Send(p) if p.seqno == 1002)));
    }

    #[test]
    fn duplicate_data_in_recovery_window_reacked_not_delivered() {
        let (mut half, _) = ReceiverHalf::open(1000, 3);
        half.on_data(1001, b"hi".to_vec());
        let effects = half.on_data(1001, b"hi".to_vec());
        assert!(!effects.iter().any(|e| matches!(e, Effect::Deliver(_))));
        assert!(effects.iter().any(|e| matches!(e, Effect::Send(p) if p.seqno == 1002)));
    }

    #[test]
    fn far_out_of_window_data_is_discarded() {
        let (mut half, _) = ReceiverHalf::open(1000, 3);
        half.on_data(1001, b"hi".to_vec());
        let effects = half.on_data(50, b"stale".to_vec());
        assert!(effects.is_empty());
    }

    #[test]
    fn fin_at_expected_seq_finishes() {
        let (mut half, _) = ReceiverHalf::open(1000, 3);
        half.on_data(1001, b"hi".to_vec());
        let effects = half.on_fin(1002);
        assert!(half.finished());
        assert_eq!(half.state(), ReceiverState::Done);
        assert!(effects.iter().any(|e| matches!(e, Effect::Send(p) if p.seqno == 1003)));
    }

    #[test]
    fn fin_at_wrong_seq_is_discarded() {
        let (mut half, _) = ReceiverHalf::open(1000, 3);
        half.on_data(1001, b"hi".to_vec());
        let effects = half.on_fin(9999);
        assert!(!half.finished());
        assert!(effects.is_empty());
    }
}
