// Fixed big-endian layout:
// byte 0      version
// byte 1      type tag (1=DATA 2=ACK 4=SYN 5=FIN)
// bytes 2-3   reserved
// bytes 4-7   sequence number (u32, BE)
// bytes 8-11  payload length (i32, BE; 0 for control packets)
// bytes 12..  payload (MAXPKTSIZE bytes, only the first payload_length meaningful)

use std::fmt;

pub const VERSION: u8 = 1;
pub const MAXPKTSIZE: usize = 1000;
pub const HEADER_LEN: usize = 12;
pub const PACKET_LEN: usize = HEADER_LEN + MAXPKTSIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Data,
    Ack,
    Syn,
    Fin,
}

impl PacketKind {
    fn to_tag(self) -> u8 {
        match self {
            PacketKind::Data => 1,
            PacketKind::Ack => 2,
            PacketKind::Syn => 4,
            PacketKind::Fin => 5,
        }
    }

    fn from_tag(tag: u8) -> Option<PacketKind> {
        match tag {
            1 => Some(PacketKind::Data),
            2 => Some(PacketKind::Ack),
            4 => Some(PacketKind::Syn),
            5 => Some(PacketKind::Fin),
            _ => None,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PacketKind::Data => "DATA",
            PacketKind::Ack => "ACK",
            PacketKind::Syn => "SYN",
            PacketKind::Fin => "FIN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub seqno: u32,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn control(kind: PacketKind, seqno: u32) -> Packet {
        debug_assert!(!matches!(kind, PacketKind::Data));
        Packet {
            kind,
            seqno,
            payload: Vec::new(),
        }
    }

    pub fn data(seqno: u32, payload: Vec<u8>) -> Packet {
        debug_assert!(payload.len() <= MAXPKTSIZE);
        Packet {
            kind: PacketKind::Data,
            seqno,
            payload,
        }
    }

    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[0] = VERSION;
        buf[1] = self.kind.to_tag();
        // bytes 2-3 reserved, left zeroed
        buf[4..8].copy_from_slice(&self.seqno.to_be_bytes());
        buf[8..12].copy_from_slice(&(self.payload.len() as i32).to_be_bytes());
        buf[HEADER_LEN..HEADER_LEN + self.payload.len()].copy_from_slice(&self.payload);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Packet, DecodeError> {
        if buf.len() < HEADER_LEN {
            return Err(DecodeError::TooShort);
        }
        let version = buf[0];
        if version != VERSION {
            return Err(DecodeError::BadVersion(version));
        }
        let kind = PacketKind::from_tag(buf[1]).ok_or(DecodeError::UnknownType(buf[1]))?;
        let seqno = u32::from_be_bytes(buf[4..8].try_into().unwrap());
        let payload_length = i32::from_be_bytes(buf[8..12].try_into().unwrap());
        if payload_length < 0 || payload_length as usize > MAXPKTSIZE {
            return Err(DecodeError::PayloadLenOutOfRange(payload_length));
        }
        let payload_length = payload_length as usize;
        let available = buf.len() - HEADER_LEN;
        if payload_length > available {
            return Err(DecodeError::TooShort);
        }
        let payload = buf[HEADER_LEN..HEADER_LEN + payload_length].to_vec();
        Ok(Packet {
            kind,
            seqno,
            payload,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("datagram shorter than the fixed header")]
    TooShort,
    #[error("unsupported protocol version {0}")]
    BadVersion(u8),
    #[error("unknown packet type tag {0}")]
    UnknownType(u8),
    #[error("payload length {0} out of range")]
    PayloadLenOutOfRange(i32),
}
