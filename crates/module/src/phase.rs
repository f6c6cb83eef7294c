//! Phase controller: which operations are legal at which block.
//!
//! `set_phase(p)` at block `b` opens `p` at `b + confirmation_length`. Each
//! phase then has an open window `[s, s + L)` and a dispute window
//! `[s + L, s + 2L)`. Past `s + 2L` a running round is halted.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::info;

use ethdkg_types::Phase;

use crate::error::{AllowedWindow, EthDkgError, Window};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PhaseController {
    /// Round counter, 0 before the first round
    pub nonce: u64,
    pub phase: Phase,
    pub phase_start_block: u64,
    pub phase_length: u64,
    pub confirmation_length: u64,
    /// Contributions accepted in the current phase
    pub num_participants: u32,
}

impl PhaseController {
    pub fn new(phase_length: u64, confirmation_length: u64) -> Self {
        Self {
            nonce: 0,
            phase: Phase::Completion,
            phase_start_block: 0,
            phase_length,
            confirmation_length,
            num_participants: 0,
        }
    }

    pub fn open_window(&self) -> Range<u64> {
        self.phase_start_block..self.phase_start_block.saturating_add(self.phase_length)
    }

    pub fn dispute_window(&self) -> Range<u64> {
        let open = self.open_window();
        open.end..open.end.saturating_add(self.phase_length)
    }

    /// Window of the current phase that `block` falls in.
    pub fn window_at(&self, block: u64) -> Option<Window> {
        if self.open_window().contains(&block) {
            Some(Window::Open)
        } else if self.dispute_window().contains(&block) {
            Some(Window::Dispute)
        } else {
            None
        }
    }

    /// Check that `block` falls in one of the accepted `(phase, window)` pairs.
    ///
    /// Returns the pair that matched, or `IncorrectPhase` listing every pair
    /// that would have been accepted.
    pub fn require(&self, block: u64, accepted: &[(Phase, Window)]) -> Result<(Phase, Window), EthDkgError> {
        if self.nonce > 0 {
            if let Some(window) = self.window_at(block) {
                if accepted.contains(&(self.phase, window)) {
                    return Ok((self.phase, window));
                }
            }
        }

        Err(EthDkgError::IncorrectPhase {
            current: self.phase,
            block,
            phase_start: self.phase_start_block,
            phase_length: self.phase_length,
            allowed: accepted
                .iter()
                .map(|(phase, window)| AllowedWindow {
                    phase: *phase,
                    window: *window,
                })
                .collect(),
        })
    }

    /// Begin a new round at `block` with registration open.
    pub fn start_round(&mut self, block: u64) {
        self.nonce += 1;
        self.set_phase(Phase::RegistrationOpen, block);
    }

    pub fn set_phase(&mut self, phase: Phase, block: u64) {
        self.phase = phase;
        self.phase_start_block = block.saturating_add(self.confirmation_length);
        self.num_participants = 0;
        info!(nonce = self.nonce, %phase, start = self.phase_start_block, "phase changed");
    }

    /// Enter `phase` from the dispute window of the current phase, keeping
    /// the block range: the new open window is the old dispute window.
    pub fn enter_from_dispute(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_start_block = self.phase_start_block.saturating_add(self.phase_length);
        self.num_participants = 0;
        info!(nonce = self.nonce, %phase, start = self.phase_start_block, "phase changed");
    }

    /// Count a contribution; the last outstanding one moves the round on.
    pub fn on_contribution(&mut self, validators_count: u32, block: u64) -> Option<Phase> {
        self.num_participants += 1;
        if self.num_participants < validators_count {
            return None;
        }
        let next = self.phase.next()?;
        self.set_phase(next, block);
        Some(next)
    }

    pub fn is_running(&self) -> bool {
        self.nonce > 0 && self.phase != Phase::Completion
    }

    pub fn is_completed(&self) -> bool {
        self.nonce > 0 && self.phase == Phase::Completion
    }

    /// Running, but past every window of the current phase.
    pub fn is_halted(&self, block: u64) -> bool {
        self.is_running() && block >= self.dispute_window().end
    }
}
