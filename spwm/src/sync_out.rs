//! Square wave at the signal frequency, for triggering a scope or a second
//! inverter.

use crate::deadtime::DeadTime;
use crate::hw::{EngineMask, Role, Sequencer, SequencerBlock};
use crate::SetupError;

/// Loop count for each half of the sync output period.
pub fn half_period(signal_period: u32, dead_time: &DeadTime) -> u32 {
    (signal_period / 2).saturating_sub(dead_time.execution_compensation())
}

pub struct SyncOutput<S> {
    sequencer: S,
    half_period: u32,
}

impl<S: Sequencer> SyncOutput<S> {
    /// Claims a sequencer and loads the half period. No channel is involved.
    pub fn arm<B>(block: &mut B, signal_period: u32, dead_time: &DeadTime) -> Result<Self, SetupError>
    where
        B: SequencerBlock<Sequencer = S>,
    {
        let mut sequencer = block
            .claim_sequencer(Role::SyncOut)
            .ok_or(SetupError::NoSequencer(Role::SyncOut))?;
        let half_period = half_period(signal_period, dead_time);
        sequencer.load_constant(half_period);
        Ok(Self {
            sequencer,
            half_period,
        })
    }

    pub fn mask(&self) -> EngineMask {
        self.sequencer.mask()
    }

    pub fn half_period(&self) -> u32 {
        self.half_period
    }

    pub fn into_sequencer(self) -> S {
        self.sequencer
    }
}
