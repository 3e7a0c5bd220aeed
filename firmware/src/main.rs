#![no_std]
#![no_main]

mod blink;
mod output;
mod panic;
mod stream;

use defmt::error;
use defmt::info;
use defmt_rtt as _;
use fugit::NanosDurationU32;
// The macro for our start-up function
use rp_pico::entry;

use rp_pico::hal;
use rp_pico::hal::pac;
use rp_pico::hal::Clock;

use embedded_hal::digital::v2::OutputPin;

use spwm::deadtime::DeadTime;
use spwm::diagnostics;
use spwm::playback::LegProgram;
use spwm::playback::PlaybackEngine;
use spwm::synth;
use spwm::table::Align2048;
use spwm::table::RingTable;
use spwm::Modulation;

use crate::blink::BlinkCode;
use crate::output::PioBlock;

// 2 * MOD_INDEX_MF entries of 4 bytes
type TableAlign = Align2048;
type Table = RingTable<TableAlign, { config::TABLE_LEN }>;

// The bridge pins are taken as typed pins in run() and in the panic handler
const _: () = assert!(
    config::PIN_H1_HIGH == 14
        && config::PIN_H1_LOW == 15
        && config::PIN_H2_LOW == 16
        && config::PIN_H2_HIGH == 17
        && config::PIN_SYNC_OUT == 18
);

const MODULATION: Modulation = Modulation::new(
    config::SIGNAL_FREQ_HZ,
    config::MOD_INDEX_MF,
    config::MOD_INDEX_MA,
    NanosDurationU32::from_ticks(config::TICK_NANOS),
);

/// Entry point to our bare-metal application.
///
/// The `#[entry]` macro ensures the Cortex-M start-up code calls this function
/// as soon as all global variables are initialised.
///
/// The function computes both switching tables, hands them to PIO0 and DMA and
/// then sleeps while the hardware drives the bridge.
#[entry]
fn main() -> ! {
    run()
}

fn run() -> ! {
    let core = unsafe { pac::CorePeripherals::steal() };
    let mut pac = unsafe { pac::Peripherals::steal() };

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // The default is to generate a 125 MHz system clock
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        panic!("clock setup failed");
    };

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());
    let mut led_pin = pins.led.into_push_pull_output();
    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS);

    delay.delay_ms(config::STARTUP_DELAY_MILLIS);
    info!(
        "spwm: {} Hz, mf {}, ma {}, tick {} ns",
        MODULATION.signal_freq_hz,
        MODULATION.mf,
        MODULATION.ma,
        MODULATION.tick.ticks()
    );

    let dead_time = match DeadTime::new(
        config::DEAD_TIME,
        config::DEADTIME_COMPENSATION,
        config::EXEC_DELAY_COMPENSATION,
    ) {
        Ok(dead_time) => dead_time,
        Err(e) => {
            error!("{}", e);
            blink::blink_signals_loop(&mut led_pin, &mut delay, BlinkCode::Config);
        }
    };

    let (Some(leg_a), Some(leg_b)) = (
        cortex_m::singleton!(: Table = Table::new()),
        cortex_m::singleton!(: Table = Table::new()),
    ) else {
        panic!("tables already taken");
    };

    let start = timer.get_counter();
    let synthesis = match synth::synthesize(&MODULATION, leg_a.as_mut_slice(), leg_b.as_mut_slice()) {
        Ok(synthesis) => synthesis,
        Err(e) => {
            error!("synthesis failed: {}", e);
            blink::blink_signals_loop(&mut led_pin, &mut delay, BlinkCode::Synthesis);
        }
    };
    let elapsed = timer.get_counter() - start;
    info!(
        "synthesized {} entries per leg in {} us, period {} ticks",
        leg_a.len(),
        elapsed.to_micros(),
        synthesis.signal_period
    );

    let mut sync = synthesis.sync;
    if let Err(e) = dead_time.adjust([leg_a.as_mut_slice(), leg_b.as_mut_slice()], &mut sync) {
        error!("dead time adjustment failed: {}", e);
        blink::blink_signals_loop(&mut led_pin, &mut delay, BlinkCode::Adjustment);
    }

    // No more writes from here on, the DMA reads the tables forever
    let leg_a: &'static Table = leg_a;
    let leg_b: &'static Table = leg_b;

    info!("   i    a raw    a adj    b raw    b adj");
    for row in diagnostics::rows([leg_a.as_slice(), leg_b.as_slice()], sync, &dead_time) {
        info!("{}", row);
    }

    let _h1_high = pins.gpio14.into_mode::<hal::gpio::FunctionPio0>();
    let _h1_low = pins.gpio15.into_mode::<hal::gpio::FunctionPio0>();
    let _h2_low = pins.gpio16.into_mode::<hal::gpio::FunctionPio0>();
    let _h2_high = pins.gpio17.into_mode::<hal::gpio::FunctionPio0>();
    let _sync_out = pins.gpio18.into_mode::<hal::gpio::FunctionPio0>();

    let block = PioBlock::new(pac.PIO0, pac.DMA, &mut pac.RESETS);
    let legs = [
        LegProgram {
            ring: leg_a.ring(),
            sync_offset: sync[0],
        },
        LegProgram {
            ring: leg_b.ring(),
            sync_offset: sync[1],
        },
    ];
    let engine = match PlaybackEngine::arm(block, legs, &dead_time, synthesis.signal_period) {
        Ok(engine) => engine,
        Err(e) => {
            error!("setup failed: {}", e);
            blink::blink_signals_loop(&mut led_pin, &mut delay, BlinkCode::Setup);
        }
    };
    for leg in engine.legs() {
        let (data, reload) = leg.channel().channels();
        info!(
            "{}: sm {}, dma {} reloaded by {}",
            leg.role(),
            leg.sequencer().index(),
            data,
            reload
        );
    }
    info!(
        "sync out: sm {}, half period {} ticks",
        engine.sync_output().mask().0.trailing_zeros(),
        engine.sync_output().half_period()
    );

    let engine = engine.start();
    info!("running: {}", engine.is_running());
    let _ = led_pin.set_high();

    loop {
        cortex_m::asm::wfi();
    }
}
