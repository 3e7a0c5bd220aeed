//! Static storage for duration tables that a DMA channel can read as a ring.
//!
//! A ring read wraps the address at a power-of-two boundary, so the table must
//! start on a multiple of its own size in bytes.

use core::ops::{Deref, DerefMut};

use crate::hw::RingSource;

/// Zero-sized marker that raises the alignment of [`RingTable`].
pub trait RingAlignment {
    /// Size of the ring in bytes, equal to the alignment.
    const BYTES: usize;
}

macro_rules! ring_alignment {
    ($($name:ident = $bytes:literal),* $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, Default)]
            #[repr(align($bytes))]
            pub struct $name;

            impl RingAlignment for $name {
                const BYTES: usize = $bytes;
            }
        )*
    };
}

ring_alignment! {
    Align16 = 16,
    Align32 = 32,
    Align64 = 64,
    Align128 = 128,
    Align256 = 256,
    Align512 = 512,
    Align1024 = 1024,
    Align2048 = 2048,
    Align4096 = 4096,
    Align8192 = 8192,
    Align16384 = 16384,
    Align32768 = 32768,
}

/// `N` durations aligned to their combined size `A::BYTES`.
#[repr(C)]
pub struct RingTable<A: RingAlignment, const N: usize> {
    _align: [A; 0],
    entries: [u32; N],
}

impl<A: RingAlignment, const N: usize> RingTable<A, N> {
    const LAYOUT_OK: () = assert!(
        N * core::mem::size_of::<u32>() == A::BYTES,
        "ring table size must equal its alignment"
    );

    pub const fn new() -> Self {
        let _ = Self::LAYOUT_OK;
        Self {
            _align: [],
            entries: [0; N],
        }
    }

    /// Address bits the DMA ring wraps on.
    pub const fn ring_size_bits() -> u8 {
        A::BYTES.trailing_zeros() as u8
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.entries
    }

    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.entries
    }

    /// Hands the table to a streaming channel. Only possible once the table
    /// lives for the rest of the program.
    pub fn ring(&'static self) -> RingSource {
        RingSource {
            entries: &self.entries,
            ring_size_bits: Self::ring_size_bits(),
        }
    }
}

impl<A: RingAlignment, const N: usize> Default for RingTable<A, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RingAlignment, const N: usize> Deref for RingTable<A, N> {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.entries
    }
}

impl<A: RingAlignment, const N: usize> DerefMut for RingTable<A, N> {
    fn deref_mut(&mut self) -> &mut [u32] {
        &mut self.entries
    }
}
