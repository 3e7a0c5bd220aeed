use fugit::NanosDurationU32;

use crate::ConfigError;

/// Fixed-point value of unit amplitude, for both the carrier and the reference.
pub const SCALE: i32 = 1_000_000;

/// One half-bridge of the H-bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Leg {
    A,
    B,
}

impl Leg {
    pub const BOTH: [Leg; 2] = [Leg::A, Leg::B];

    pub const fn index(self) -> usize {
        match self {
            Leg::A => 0,
            Leg::B => 1,
        }
    }
}

/// Frequency and amplitude modulation of the switching pattern.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Modulation {
    pub signal_freq_hz: u32,
    /// Carrier to signal frequency ratio.
    pub mf: u16,
    /// Reference amplitude relative to the carrier.
    pub ma: f64,
    /// Duration of one time step, the unit of every table entry.
    pub tick: NanosDurationU32,
}

impl Modulation {
    pub const fn new(signal_freq_hz: u32, mf: u16, ma: f64, tick: NanosDurationU32) -> Self {
        Self {
            signal_freq_hz,
            mf,
            ma,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mf == 0 || self.mf % 4 != 0 {
            return Err(ConfigError::CarrierRatio(self.mf));
        }
        // Also rejects NaN
        if !(self.ma > 0.0 && self.ma < 1.0) {
            return Err(ConfigError::ModulationIndex);
        }
        if self.signal_freq_hz == 0 || self.tick.ticks() == 0 {
            return Err(ConfigError::ZeroRate);
        }
        Ok(())
    }

    /// Number of entries in each leg's duration table.
    pub const fn table_len(&self) -> usize {
        2 * self.mf as usize
    }
}
