#![cfg_attr(not(test), no_std)]

//! Complementary unipolar SPWM for a single-phase H-bridge.
//!
//! [`synth::synthesize`] fills one duration table per bridge leg,
//! [`deadtime::DeadTime::adjust`] corrects them for the sequencer latencies and
//! [`playback::PlaybackEngine`] hands them to the hardware and starts every
//! output in the same instant.

pub mod deadtime;
pub mod diagnostics;
mod error;
pub mod hw;
mod params;
pub mod playback;
#[cfg(test)]
mod sequencer_model;
pub mod sync_out;
pub mod synth;
pub mod table;

pub use error::*;
pub use params::*;
