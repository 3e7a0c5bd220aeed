#![no_std]

// ----------------------------------------------------------------------------
// Configurable
// ----------------------------------------------------------------------------
pub const SIGNAL_FREQ_HZ: u32 = 50;
pub const MOD_INDEX_MF: u16 = 256; // Must be a multiple of 4. Also change TableAlign in firmware
pub const MOD_INDEX_MA: f64 = 0.8;

pub const DEAD_TIME: u32 = 50; // Gap between hi and lo side switching, in ticks
pub const DEADTIME_COMPENSATION: u32 = 2; // Dead time cycles of spwm.pio not counted by the loop
pub const EXEC_DELAY_COMPENSATION: u32 = 5; // All cycles of spwm.pio per transition not counted by a loop

pub const PIN_H1_HIGH: u8 = 14;
pub const PIN_H1_LOW: u8 = 15;
pub const PIN_H2_LOW: u8 = 16;
pub const PIN_H2_HIGH: u8 = 17;
pub const PIN_SYNC_OUT: u8 = 18;

// ----------------------------------------------------------------------------
// Should probably not be changed:
// ----------------------------------------------------------------------------
pub const CLOCK_RATE: u32 = 125_000_000;
pub const TICK_NANOS: u32 = 10; // One PIO instruction per tick
pub const STARTUP_DELAY_MILLIS: u32 = 2000; // Time for a debug probe to attach before output starts

// ----------------------------------------------------------------------------
// Derived from other values:
// ----------------------------------------------------------------------------
pub const TICK_RATE: u32 = 1_000_000_000 / TICK_NANOS;

pub const TABLE_LEN: usize = 2 * MOD_INDEX_MF as usize;
pub const TABLE_BYTES: usize = TABLE_LEN * core::mem::size_of::<u32>();

// PIO clock divisor in 16.8 fixed point, CLOCK_RATE / TICK_RATE
pub const PIO_CLKDIV_INT: u16 = (CLOCK_RATE / TICK_RATE) as u16;
pub const PIO_CLKDIV_FRAC: u8 = (((CLOCK_RATE % TICK_RATE) as u64 * 256) / TICK_RATE as u64) as u8;

const _: () = assert!(MOD_INDEX_MF % 4 == 0 && MOD_INDEX_MF > 0);
const _: () = assert!(TABLE_BYTES.is_power_of_two());
const _: () = assert!(CLOCK_RATE >= TICK_RATE);
const _: () = assert!(DEAD_TIME > DEADTIME_COMPENSATION);
// Side-set pins of each leg are consecutive
const _: () = assert!(PIN_H1_LOW == PIN_H1_HIGH + 1);
const _: () = assert!(PIN_H2_HIGH == PIN_H2_LOW + 1);
