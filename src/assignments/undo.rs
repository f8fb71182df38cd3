//! Per-block undo records for assignment state.
//!
//! Every state change made while connecting a block is paired with enough
//! information to reverse it when the block is disconnected during a reorg.
//! The records are consumed strictly in reverse order.

use crate::primitives::ser::{write_compact_size, DecodeError, Reader};

use super::{AssignmentStore, ForgingAssignment};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndoKind {
    /// A record was created; undo deletes it.
    Added = 0,
    /// An existing record was replaced; undo restores the prior record.
    Modified = 1,
    /// A record was marked revoked; undo restores the unrevoked record.
    Revoked = 2,
}

impl UndoKind {
    fn from_u8(value: u8) -> Result<UndoKind, DecodeError> {
        match value {
            0 => Ok(UndoKind::Added),
            1 => Ok(UndoKind::Modified),
            2 => Ok(UndoKind::Revoked),
            _ => Err(DecodeError::BadTag("forging undo kind")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForgingUndo {
    pub kind: UndoKind,
    /// For `Added` the record that was created (keys the deletion);
    /// otherwise the full record as it stood before the change.
    pub assignment: ForgingAssignment,
}

impl ForgingUndo {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.kind as u8);
        self.assignment.encode(out);
    }

    pub fn decode(reader: &mut Reader) -> Result<ForgingUndo, DecodeError> {
        let kind = UndoKind::from_u8(reader.read_u8()?)?;
        let assignment = ForgingAssignment::decode(reader)?;
        Ok(ForgingUndo { kind, assignment })
    }
}

/// Serialize a block's undo list (appended to the host's block undo data).
pub fn encode_undo_list(undos: &[ForgingUndo], out: &mut Vec<u8>) {
    write_compact_size(out, undos.len() as u64);
    for undo in undos {
        undo.encode(out);
    }
}

pub fn decode_undo_list(reader: &mut Reader) -> Result<Vec<ForgingUndo>, DecodeError> {
    let count = reader.read_compact_size()?;
    let mut undos = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        undos.push(ForgingUndo::decode(reader)?);
    }
    Ok(undos)
}

/// Roll back a block's assignment changes. Records are applied newest
/// first, mirroring the order `connect` produced them in.
pub fn disconnect_block_assignments(undos: &[ForgingUndo], store: &mut dyn AssignmentStore) {
    for undo in undos.iter().rev() {
        match undo.kind {
            UndoKind::Added => store.remove(&undo.assignment.plot_address),
            UndoKind::Modified | UndoKind::Revoked => store.put(undo.assignment.clone()),
        }
    }
}
