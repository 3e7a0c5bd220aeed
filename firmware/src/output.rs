use pio::Instruction;
use pio::InstructionOperands;
use pio::OutDestination;
use pio_proc::pio_file;
use rp_pico::hal;
use rp_pico::hal::pac;

use hal::pio::Buffers;
use hal::pio::PIOBuilder;
use hal::pio::PIOExt;
use hal::pio::PinDir;
use hal::pio::Rx;
use hal::pio::StateMachine;
use hal::pio::StateMachineIndex;
use hal::pio::Stopped;
use hal::pio::Tx;
use hal::pio::UninitStateMachine;
use hal::pio::PIO;
use hal::pio::SM0;
use hal::pio::SM1;
use hal::pio::SM2;
use hal::pio::SM3;

use spwm::hw::EngineMask;
use spwm::hw::Role;
use spwm::hw::Sequencer;
use spwm::hw::SequencerBlock;

use crate::stream::DmaPool;
use crate::stream::DmaStream;

const CTRL_SM_ENABLE_MASK: u32 = 0xf;
const CTRL_CLKDIV_RESTART_SHIFT: u32 = 8;

fn pio0_regs() -> &'static pac::pio0::RegisterBlock {
    // CTRL is written as a whole for joint enables and the TX FIFO addresses
    // are only read. Everything else goes through the hal objects.
    unsafe { &*pac::PIO0::ptr() }
}

struct Parts<SM: StateMachineIndex> {
    sm: StateMachine<(pac::PIO0, SM), Stopped>,
    rx: Rx<(pac::PIO0, SM)>,
    tx: Tx<(pac::PIO0, SM)>,
}

impl<SM: StateMachineIndex> Parts<SM> {
    fn build(
        pio: &mut PIO<pac::PIO0>,
        uninit: UninitStateMachine<(pac::PIO0, SM)>,
        role: Role,
    ) -> Result<Self, UninitStateMachine<(pac::PIO0, SM)>> {
        let (program, pin_base, pin_count) = match role {
            Role::LegA => (
                pio_file!("./src/spwm.pio", select_program("spwm_leg_a")).program,
                config::PIN_H1_HIGH,
                2,
            ),
            Role::LegB => (
                pio_file!("./src/spwm.pio", select_program("spwm_leg_b")).program,
                config::PIN_H2_LOW,
                2,
            ),
            Role::SyncOut => (
                pio_file!("./src/spwm.pio", select_program("sync_out")).program,
                config::PIN_SYNC_OUT,
                1,
            ),
        };
        let Ok(installed) = pio.install(&program) else {
            return Err(uninit);
        };

        // One instruction per tick
        let (mut sm, rx, tx) = PIOBuilder::from_program(installed)
            .side_set_pin_base(pin_base)
            .clock_divisor_fixed_point(config::PIO_CLKDIV_INT, config::PIO_CLKDIV_FRAC)
            .buffers(Buffers::OnlyTx)
            .build(uninit);
        sm.set_pindirs((pin_base..pin_base + pin_count).map(|pin| (pin, PinDir::Output)));

        Ok(Self { sm, rx, tx })
    }

    fn free(self, pio: &mut PIO<pac::PIO0>) -> UninitStateMachine<(pac::PIO0, SM)> {
        let (uninit, program) = self.sm.uninit(self.rx, self.tx);
        pio.uninstall(program);
        uninit
    }

    fn load_constant(&mut self, value: u32, latch: bool) {
        self.tx.write(value);
        if !latch {
            // Stays in the FIFO for the program's first pull
            return;
        }
        self.sm.exec_instruction(Instruction {
            operands: InstructionOperands::PULL {
                if_empty: false,
                block: false,
            },
            delay: 0,
            side_set: None,
        });
        self.sm.exec_instruction(Instruction {
            operands: InstructionOperands::OUT {
                destination: OutDestination::ISR,
                bit_count: 32,
            },
            delay: 0,
            side_set: None,
        });
    }
}

enum Machine {
    Sm0(Parts<SM0>),
    Sm1(Parts<SM1>),
    Sm2(Parts<SM2>),
    Sm3(Parts<SM3>),
}

macro_rules! with_parts {
    ($machine:expr, $parts:ident => $body:expr) => {
        match $machine {
            Machine::Sm0($parts) => $body,
            Machine::Sm1($parts) => $body,
            Machine::Sm2($parts) => $body,
            Machine::Sm3($parts) => $body,
        }
    };
}

/// A PIO0 state machine with one of the programs from `spwm.pio` installed.
pub struct PioSequencer {
    index: u8,
    machine: Machine,
    loaded: u8,
}

impl PioSequencer {
    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn tx_fifo_address(&self) -> u32 {
        &pio0_regs().txf[self.index as usize] as *const _ as u32
    }

    /// DREQ_PIO0_TX0 is 0, the other state machines follow.
    pub fn tx_dreq(&self) -> u8 {
        self.index
    }
}

impl Sequencer for PioSequencer {
    fn mask(&self) -> EngineMask {
        EngineMask::bit(self.index)
    }

    fn load_constant(&mut self, value: u32) {
        let latch = self.loaded == 0;
        with_parts!(&mut self.machine, parts => parts.load_constant(value, latch));
        self.loaded = self.loaded.saturating_add(1);
    }
}

/// PIO0 together with the DMA channels that feed it.
pub struct PioBlock {
    pio: PIO<pac::PIO0>,
    sm0: Option<UninitStateMachine<(pac::PIO0, SM0)>>,
    sm1: Option<UninitStateMachine<(pac::PIO0, SM1)>>,
    sm2: Option<UninitStateMachine<(pac::PIO0, SM2)>>,
    sm3: Option<UninitStateMachine<(pac::PIO0, SM3)>>,
    dma: DmaPool,
}

macro_rules! claim_free {
    ($self:ident, $role:ident, $($field:ident => $variant:ident: $sm:ty),*) => {
        $(
            if let Some(uninit) = $self.$field.take() {
                return match Parts::build(&mut $self.pio, uninit, $role) {
                    Ok(parts) => Some(PioSequencer {
                        index: <$sm>::id() as u8,
                        machine: Machine::$variant(parts),
                        loaded: 0,
                    }),
                    Err(uninit) => {
                        $self.$field = Some(uninit);
                        None
                    }
                };
            }
        )*
    };
}

impl PioBlock {
    pub fn new(pio0: pac::PIO0, dma: pac::DMA, resets: &mut pac::RESETS) -> Self {
        let (pio, sm0, sm1, sm2, sm3) = pio0.split(resets);
        Self {
            pio,
            sm0: Some(sm0),
            sm1: Some(sm1),
            sm2: Some(sm2),
            sm3: Some(sm3),
            dma: DmaPool::new(dma, resets),
        }
    }
}

impl SequencerBlock for PioBlock {
    type Sequencer = PioSequencer;
    type Channel = DmaStream;

    fn claim_sequencer(&mut self, role: Role) -> Option<PioSequencer> {
        claim_free!(self, role, sm0 => Sm0: SM0, sm1 => Sm1: SM1, sm2 => Sm2: SM2, sm3 => Sm3: SM3);
        None
    }

    fn claim_channel(&mut self) -> Option<DmaStream> {
        self.dma.claim()
    }

    fn enable_in_sync(&mut self, mask: EngineMask) {
        let bits = u32::from(mask.0) & CTRL_SM_ENABLE_MASK;
        pio0_regs().ctrl.modify(|r, w| unsafe {
            w.bits(r.bits() | bits | bits << CTRL_CLKDIV_RESTART_SHIFT)
        });
    }

    fn disable_in_sync(&mut self, mask: EngineMask) {
        let bits = u32::from(mask.0) & CTRL_SM_ENABLE_MASK;
        pio0_regs()
            .ctrl
            .modify(|r, w| unsafe { w.bits(r.bits() & !bits) });
    }

    fn enabled(&self) -> EngineMask {
        EngineMask((pio0_regs().ctrl.read().bits() & CTRL_SM_ENABLE_MASK) as u8)
    }

    fn release_sequencer(&mut self, sequencer: PioSequencer) {
        match sequencer.machine {
            Machine::Sm0(parts) => self.sm0 = Some(parts.free(&mut self.pio)),
            Machine::Sm1(parts) => self.sm1 = Some(parts.free(&mut self.pio)),
            Machine::Sm2(parts) => self.sm2 = Some(parts.free(&mut self.pio)),
            Machine::Sm3(parts) => self.sm3 = Some(parts.free(&mut self.pio)),
        }
    }

    fn release_channel(&mut self, channel: DmaStream) {
        self.dma.release(channel);
    }
}
