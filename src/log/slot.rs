//! Slot layout
//!
//! Pure helpers for building and parsing one slot buffer.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, StoreError};

/// Status byte of a live slot
pub const STATUS_ACTIVE: u8 = 0x01;

/// Status byte of a tombstoned slot
pub const STATUS_DELETED: u8 = 0x02;

/// Decoded status of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Active,
    Deleted,
}

impl SlotStatus {
    pub fn as_byte(self) -> u8 {
        match self {
            SlotStatus::Active => STATUS_ACTIVE,
            SlotStatus::Deleted => STATUS_DELETED,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            STATUS_ACTIVE => Some(SlotStatus::Active),
            STATUS_DELETED => Some(SlotStatus::Deleted),
            _ => None,
        }
    }
}

/// Check that a payload can be stored in a slot of `slot_size` bytes
pub fn validate_payload(payload: &[u8], slot_size: usize) -> Result<()> {
    let max = slot_size - 1;
    if payload.len() > max {
        return Err(StoreError::PayloadTooLarge {
            len: payload.len(),
            max,
        });
    }
    if payload.is_empty() {
        return Err(StoreError::Encoding("empty payload".to_string()));
    }
    if let Some(pos) = payload.iter().position(|&b| b == 0) {
        return Err(StoreError::Encoding(format!(
            "payload contains a NUL byte at position {}",
            pos
        )));
    }
    Ok(())
}

/// Build a full ACTIVE slot: [status][payload][zero padding]
pub fn encode_slot(payload: &[u8], slot_size: usize) -> Result<BytesMut> {
    validate_payload(payload, slot_size)?;

    let mut buf = BytesMut::with_capacity(slot_size);
    buf.put_u8(STATUS_ACTIVE);
    buf.put_slice(payload);
    buf.put_bytes(0, slot_size - 1 - payload.len());

    Ok(buf)
}

/// Parse a full slot buffer read from `offset`
///
/// Returns the status and the payload (bytes before the first zero, or
/// the whole payload area).
pub fn decode_slot(slot: &[u8], offset: u64) -> Result<(SlotStatus, &[u8])> {
    let Some((&status_byte, area)) = slot.split_first() else {
        return Err(StoreError::CorruptSlot {
            offset,
            reason: "empty slot buffer".to_string(),
        });
    };

    let status = SlotStatus::from_byte(status_byte).ok_or_else(|| StoreError::CorruptSlot {
        offset,
        reason: format!("unknown status byte 0x{:02x}", status_byte),
    })?;

    let len = area.iter().position(|&b| b == 0).unwrap_or(area.len());
    let payload = &area[..len];

    if status == SlotStatus::Active && payload.is_empty() {
        return Err(StoreError::CorruptSlot {
            offset,
            reason: "active slot has no payload".to_string(),
        });
    }

    Ok((status, payload))
}
