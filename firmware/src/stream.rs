//! Endless DMA streams from a ring table into a PIO TX FIFO.
//!
//! The transfer counter of an RP2040 channel runs out, so every stream uses two
//! channels. The data channel reads the table as a ring of `ring_size_bits`
//! and, once the count is exhausted, chains to a reload channel. The reload
//! channel writes the table length back into the data channel's count trigger
//! register, which restarts it. Ring wrap keeps the read address in the table.

use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering;

use rp_pico::hal::pac;
use spwm::hw::RingSource;
use spwm::hw::StreamingChannel;

use crate::output::PioSequencer;

const NUM_CHANNELS: u8 = 12;
const TREQ_PERMANENT: u8 = 0x3f;

const CTRL_EN: u32 = 1 << 0;
const CTRL_DATA_SIZE_WORD: u32 = 2 << 2;
const CTRL_INCR_READ: u32 = 1 << 4;
const CTRL_RING_SIZE_SHIFT: u32 = 6;
const CTRL_CHAIN_TO_SHIFT: u32 = 11;
const CTRL_TREQ_SEL_SHIFT: u32 = 15;

/// CTRL word for a word-sized transfer into a fixed address, ring on read.
/// Chaining to the channel itself disables chaining.
fn ctrl(incr_read: bool, ring_size_bits: u8, treq: u8, chain_to: u8) -> u32 {
    let incr_read = if incr_read { CTRL_INCR_READ } else { 0 };
    CTRL_EN
        | CTRL_DATA_SIZE_WORD
        | incr_read
        | u32::from(ring_size_bits) << CTRL_RING_SIZE_SHIFT
        | u32::from(chain_to) << CTRL_CHAIN_TO_SHIFT
        | u32::from(treq) << CTRL_TREQ_SEL_SHIFT
}

// Transfer counts read by the reload channels, indexed by data channel.
#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU32 = AtomicU32::new(0);
static RELOAD_COUNT: [AtomicU32; NUM_CHANNELS as usize] = [ZERO; NUM_CHANNELS as usize];

fn regs() -> &'static pac::dma::RegisterBlock {
    // Only channels claimed from the pool are touched
    unsafe { &*pac::DMA::ptr() }
}

/// Hands out DMA channels in pairs.
pub struct DmaPool {
    _dma: pac::DMA,
    claimed: u16,
}

impl DmaPool {
    pub fn new(dma: pac::DMA, resets: &mut pac::RESETS) -> Self {
        resets.reset.modify(|_, w| w.dma().clear_bit());
        while resets.reset_done.read().dma().bit_is_clear() {}
        Self {
            _dma: dma,
            claimed: 0,
        }
    }

    fn claim_one(&mut self) -> Option<u8> {
        let ch = (0..NUM_CHANNELS).find(|ch| self.claimed & (1 << ch) == 0)?;
        self.claimed |= 1 << ch;
        Some(ch)
    }

    pub fn claim(&mut self) -> Option<DmaStream> {
        let data = self.claim_one()?;
        let Some(reload) = self.claim_one() else {
            self.claimed &= !(1 << data);
            return None;
        };
        Some(DmaStream { data, reload })
    }

    pub fn release(&mut self, stream: DmaStream) {
        self.claimed &= !((1 << stream.data) | (1 << stream.reload));
    }
}

pub struct DmaStream {
    data: u8,
    reload: u8,
}

impl DmaStream {
    pub fn channels(&self) -> (u8, u8) {
        (self.data, self.reload)
    }
}

impl StreamingChannel<PioSequencer> for DmaStream {
    fn bind(&mut self, ring: RingSource, sequencer: &PioSequencer) {
        let dma = regs();
        let data = &dma.ch[self.data as usize];
        let reload = &dma.ch[self.reload as usize];
        let count = &RELOAD_COUNT[self.data as usize];
        count.store(ring.entries.len() as u32, Ordering::Relaxed);

        reload.ch_read_addr.write(|w| unsafe { w.bits(count as *const AtomicU32 as u32) });
        reload
            .ch_write_addr
            .write(|w| unsafe { w.bits(&data.ch_al1_trans_count_trig as *const _ as u32) });
        reload.ch_trans_count.write(|w| unsafe { w.bits(1) });
        reload
            .ch_al1_ctrl
            .write(|w| unsafe { w.bits(ctrl(false, 0, TREQ_PERMANENT, self.reload)) });

        data.ch_read_addr
            .write(|w| unsafe { w.bits(ring.entries.as_ptr() as u32) });
        data.ch_write_addr
            .write(|w| unsafe { w.bits(sequencer.tx_fifo_address()) });
        data.ch_trans_count
            .write(|w| unsafe { w.bits(ring.entries.len() as u32) });
        // Triggers the transfer. The FIFO fills up now, the state machine
        // drains it once enabled.
        data.ch_ctrl_trig.write(|w| unsafe {
            w.bits(ctrl(
                true,
                ring.ring_size_bits,
                sequencer.tx_dreq(),
                self.reload,
            ))
        });
    }

    fn disable(&mut self) {
        let dma = regs();
        for ch in [self.data, self.reload] {
            dma.ch[ch as usize]
                .ch_al1_ctrl
                .modify(|r, w| unsafe { w.bits(r.bits() & !CTRL_EN) });
        }
        let mask = (1 << self.data) | (1 << self.reload);
        dma.chan_abort.write(|w| unsafe { w.bits(mask) });
        while dma.chan_abort.read().bits() & mask != 0 {}
    }
}
