//! What playback needs from the hardware: state machines that step through
//! durations, channels that feed them from memory, and a block that starts and
//! stops several state machines at once.

use core::ops::BitOr;

/// What a sequencer is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    LegA,
    LegB,
    SyncOut,
}

/// Set of sequencers within one [`SequencerBlock`], one bit per sequencer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineMask(pub u8);

impl EngineMask {
    pub const NONE: EngineMask = EngineMask(0);

    pub const fn bit(index: u8) -> Self {
        EngineMask(1 << index)
    }

    pub const fn contains(self, other: EngineMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for EngineMask {
    type Output = EngineMask;

    fn bitor(self, rhs: Self) -> Self {
        EngineMask(self.0 | rhs.0)
    }
}

/// A table a channel reads endlessly, wrapping the read address every
/// `1 << ring_size_bits` bytes.
#[derive(Clone, Copy, Debug)]
pub struct RingSource {
    pub entries: &'static [u32],
    pub ring_size_bits: u8,
}

pub trait Sequencer {
    fn mask(&self) -> EngineMask;

    /// Makes `value` available to the program before it starts.
    ///
    /// The first call latches the value into a scratch register that the
    /// program reloads on every dead-time interval. Later calls queue the value
    /// as the first word the program reads.
    fn load_constant(&mut self, value: u32);
}

pub trait StreamingChannel<S: Sequencer> {
    /// Starts feeding `ring` to `sequencer`, one word per request, forever.
    fn bind(&mut self, ring: RingSource, sequencer: &S);

    fn disable(&mut self);
}

pub trait SequencerBlock {
    type Sequencer: Sequencer;
    type Channel: StreamingChannel<Self::Sequencer>;

    /// Takes a free sequencer and sets it up for `role`, stopped.
    fn claim_sequencer(&mut self, role: Role) -> Option<Self::Sequencer>;

    fn claim_channel(&mut self) -> Option<Self::Channel>;

    /// Enables all sequencers in `mask` on the same clock cycle.
    fn enable_in_sync(&mut self, mask: EngineMask);

    fn disable_in_sync(&mut self, mask: EngineMask);

    /// Sequencers currently running.
    fn enabled(&self) -> EngineMask;

    fn release_sequencer(&mut self, sequencer: Self::Sequencer);

    fn release_channel(&mut self, channel: Self::Channel);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_engine_mask() {
        let mask = EngineMask::bit(0) | EngineMask::bit(2);
        assert_eq!(mask, EngineMask(0b101));
        assert!(mask.contains(EngineMask::bit(2)));
        assert!(!mask.contains(EngineMask::bit(1)));
        assert!(mask.contains(EngineMask::NONE));
    }
}
