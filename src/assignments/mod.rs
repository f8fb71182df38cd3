//! Forging assignments: on-chain delegation of block signing rights.
//!
//! A plot owner publishes an assignment marker to let another key sign
//! blocks for their plots, and a revocation marker to take it back. Both
//! take effect after a fixed delay, so the signer for any height is a pure
//! function of the stored record. Connect-time processing lives in
//! [`process`], the marker scripts in [`opreturn`], reorg support in
//! [`undo`].

pub mod opreturn;
pub mod process;
pub mod undo;

use std::collections::BTreeMap;

use crate::address::AccountId;
use crate::interfaces::CoinView;
use crate::primitives::ser::{DecodeError, Reader};

/// Where a plot stands in the delegation lifecycle at some height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForgingState {
    Unassigned,
    Assigning,
    Assigned,
    Revoking,
    Revoked,
}

impl ForgingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForgingState::Unassigned => "UNASSIGNED",
            ForgingState::Assigning => "ASSIGNING",
            ForgingState::Assigned => "ASSIGNED",
            ForgingState::Revoking => "REVOKING",
            ForgingState::Revoked => "REVOKED",
        }
    }
}

/// The stored delegation record for one plot address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForgingAssignment {
    pub plot_address: AccountId,
    pub forging_address: AccountId,
    pub assignment_txid: [u8; 32],
    pub assignment_height: i32,
    pub assignment_effective_height: i32,
    pub revoked: bool,
    pub revocation_txid: [u8; 32],
    pub revocation_height: i32,
    pub revocation_effective_height: i32,
}

impl ForgingAssignment {
    pub fn state_at_height(&self, height: i32) -> ForgingState {
        if height < self.assignment_effective_height {
            return ForgingState::Assigning;
        }
        if !self.revoked {
            return ForgingState::Assigned;
        }
        if height < self.revocation_effective_height {
            return ForgingState::Revoking;
        }
        ForgingState::Revoked
    }

    /// The forging address signs while the assignment is active: from its
    /// effective height through the revocation's effective height.
    pub fn is_active_at_height(&self, height: i32) -> bool {
        matches!(
            self.state_at_height(height),
            ForgingState::Assigned | ForgingState::Revoking
        )
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.plot_address.0);
        out.extend_from_slice(&self.forging_address.0);
        out.extend_from_slice(&self.assignment_txid);
        out.extend_from_slice(&self.assignment_height.to_le_bytes());
        out.extend_from_slice(&self.assignment_effective_height.to_le_bytes());
        out.push(u8::from(self.revoked));
        out.extend_from_slice(&self.revocation_txid);
        out.extend_from_slice(&self.revocation_height.to_le_bytes());
        out.extend_from_slice(&self.revocation_effective_height.to_le_bytes());
    }

    pub fn decode(reader: &mut Reader) -> Result<ForgingAssignment, DecodeError> {
        Ok(ForgingAssignment {
            plot_address: AccountId(reader.read_array()?),
            forging_address: AccountId(reader.read_array()?),
            assignment_txid: reader.read_array()?,
            assignment_height: reader.read_i32()?,
            assignment_effective_height: reader.read_i32()?,
            revoked: reader.read_u8()? != 0,
            revocation_txid: reader.read_array()?,
            revocation_height: reader.read_i32()?,
            revocation_effective_height: reader.read_i32()?,
        })
    }
}

/// Who must sign a block forged from this plot at this height.
pub fn effective_signer(
    plot: &AccountId,
    height: i32,
    view: &(impl CoinView + ?Sized),
) -> AccountId {
    match view.forging_assignment(plot, height) {
        Some(assignment) if assignment.is_active_at_height(height) => assignment.forging_address,
        _ => *plot,
    }
}

/// Lifecycle state of a plot at a height.
pub fn assignment_state(
    plot: &AccountId,
    height: i32,
    view: &(impl CoinView + ?Sized),
) -> ForgingState {
    match view.forging_assignment(plot, height) {
        Some(assignment) => assignment.state_at_height(height),
        None => ForgingState::Unassigned,
    }
}

/// Mutable access to the assignment records a chain state carries.
pub trait AssignmentStore {
    fn get(&self, plot: &AccountId) -> Option<ForgingAssignment>;
    fn put(&mut self, assignment: ForgingAssignment);
    fn remove(&mut self, plot: &AccountId);
}

/// In-memory store, useful for tests and light hosts; persistent hosts
/// implement [`AssignmentStore`] over their own database.
#[derive(Default)]
pub struct MemoryAssignmentStore {
    records: BTreeMap<AccountId, ForgingAssignment>,
}

impl MemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AssignmentStore for MemoryAssignmentStore {
    fn get(&self, plot: &AccountId) -> Option<ForgingAssignment> {
        self.records.get(plot).cloned()
    }

    fn put(&mut self, assignment: ForgingAssignment) {
        self.records.insert(assignment.plot_address, assignment);
    }

    fn remove(&mut self, plot: &AccountId) {
        self.records.remove(plot);
    }
}
