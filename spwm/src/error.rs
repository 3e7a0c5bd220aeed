use thiserror::Error;

use crate::hw::Role;
use crate::Leg;

/// Rejected configuration, detected before any table is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("mf = {0} is not a positive multiple of 4")]
    CarrierRatio(u16),
    #[error("ma must lie strictly between 0 and 1")]
    ModulationIndex,
    #[error("signal frequency and tick must be non-zero")]
    ZeroRate,
    #[error("a quarter carrier cycle is shorter than one tick")]
    CarrierTooFast,
    #[error("a quarter carrier cycle is longer than the amplitude resolution")]
    CarrierTooSlow,
    #[error("the signal period does not fit into 32 bit ticks")]
    PeriodOverflow,
    #[error("dead time {dead_time} is shorter than its instruction compensation {compensation}")]
    DeadTime { dead_time: u32, compensation: u32 },
    #[error("table holds {actual} entries, {expected} required")]
    TableLength { expected: usize, actual: usize },
}

/// Position of a value handled by the dead-time adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    SyncOffset,
    Entry(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdjustError {
    #[error("leg {leg:?} {slot:?} = {value} ticks does not exceed the correction of {correction}")]
    NonPositive {
        leg: Leg,
        slot: Slot,
        value: u32,
        correction: u32,
    },
}

/// Hardware could not be acquired. Setup cannot continue without it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError {
    #[error("no free sequencer for {0:?}")]
    NoSequencer(Role),
    #[error("no free streaming channel for {0:?}")]
    NoChannel(Role),
}
