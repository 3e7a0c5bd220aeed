//! Binds both legs and the sync output to hardware and starts them together.
//!
//! Setup per leg: claim a sequencer and a channel, load the dead-time loop
//! count and the sync offset, then let the channel stream the table. Nothing
//! runs until [`PlaybackEngine::start`] enables every sequencer in one write.
//! From then on the hardware needs no CPU time.

use core::marker::PhantomData;

use crate::deadtime::DeadTime;
use crate::hw::{EngineMask, RingSource, Role, Sequencer, SequencerBlock, StreamingChannel};
use crate::sync_out::SyncOutput;
use crate::{Leg, SetupError};

/// Sequencers are loaded and streams bound, nothing is enabled.
pub struct Armed;
/// All sequencers were enabled together.
pub struct Running;

/// Adjusted table and sync offset for one leg.
#[derive(Clone, Copy, Debug)]
pub struct LegProgram {
    pub ring: RingSource,
    pub sync_offset: u32,
}

pub struct SequencerChannel<B: SequencerBlock> {
    role: Role,
    sequencer: B::Sequencer,
    channel: B::Channel,
}

impl<B: SequencerBlock> SequencerChannel<B> {
    fn arm(
        block: &mut B,
        role: Role,
        program: LegProgram,
        dead_time: &DeadTime,
    ) -> Result<Self, SetupError> {
        let mut sequencer = block
            .claim_sequencer(role)
            .ok_or(SetupError::NoSequencer(role))?;
        let Some(mut channel) = block.claim_channel() else {
            block.release_sequencer(sequencer);
            return Err(SetupError::NoChannel(role));
        };

        // Dead time goes to the scratch register, the sync offset is the first
        // word the program pulls.
        sequencer.load_constant(dead_time.net());
        sequencer.load_constant(program.sync_offset);
        channel.bind(program.ring, &sequencer);

        Ok(Self {
            role,
            sequencer,
            channel,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn sequencer(&self) -> &B::Sequencer {
        &self.sequencer
    }

    pub fn channel(&self) -> &B::Channel {
        &self.channel
    }
}

pub struct PlaybackEngine<B: SequencerBlock, S> {
    block: B,
    legs: [SequencerChannel<B>; 2],
    sync_out: SyncOutput<B::Sequencer>,
    _state: PhantomData<S>,
}

impl<B: SequencerBlock> PlaybackEngine<B, Armed> {
    /// Prepares both legs and the sync output. Any error is fatal for the
    /// caller, hardware claimed before the failure is not handed back.
    pub fn arm(
        mut block: B,
        legs: [LegProgram; 2],
        dead_time: &DeadTime,
        signal_period: u32,
    ) -> Result<Self, SetupError> {
        let [program_a, program_b] = legs;
        let leg_a = SequencerChannel::arm(&mut block, role_of(Leg::A), program_a, dead_time)?;
        let leg_b = SequencerChannel::arm(&mut block, role_of(Leg::B), program_b, dead_time)?;
        let sync_out = SyncOutput::arm(&mut block, signal_period, dead_time)?;

        Ok(Self {
            block,
            legs: [leg_a, leg_b],
            sync_out,
            _state: PhantomData,
        })
    }

    pub fn start(mut self) -> PlaybackEngine<B, Running> {
        let mask = self.mask();
        self.block.enable_in_sync(mask);
        PlaybackEngine {
            block: self.block,
            legs: self.legs,
            sync_out: self.sync_out,
            _state: PhantomData,
        }
    }
}

impl<B: SequencerBlock> PlaybackEngine<B, Running> {
    pub fn is_running(&self) -> bool {
        self.block.enabled().contains(self.mask())
    }
}

impl<B: SequencerBlock, S> PlaybackEngine<B, S> {
    /// Every sequencer this engine drives.
    pub fn mask(&self) -> EngineMask {
        self.legs
            .iter()
            .fold(self.sync_out.mask(), |mask, leg| mask | leg.sequencer.mask())
    }

    pub fn legs(&self) -> &[SequencerChannel<B>; 2] {
        &self.legs
    }

    pub fn sync_output(&self) -> &SyncOutput<B::Sequencer> {
        &self.sync_out
    }

    pub fn block(&self) -> &B {
        &self.block
    }

    /// Stops the streams, then all sequencers at once, and gives every
    /// resource back to the block.
    pub fn shutdown(self) -> B {
        let mask = self.mask();
        let Self {
            mut block,
            legs,
            sync_out,
            ..
        } = self;
        let [mut leg_a, mut leg_b] = legs;

        leg_a.channel.disable();
        leg_b.channel.disable();
        block.disable_in_sync(mask);

        for leg in [leg_a, leg_b] {
            block.release_channel(leg.channel);
            block.release_sequencer(leg.sequencer);
        }
        block.release_sequencer(sync_out.into_sequencer());
        block
    }
}

fn role_of(leg: Leg) -> Role {
    match leg {
        Leg::A => Role::LegA,
        Leg::B => Role::LegB,
    }
}
