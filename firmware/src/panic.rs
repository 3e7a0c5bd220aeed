use embedded_hal::digital::v2::OutputPin;
use rp_pico::{hal, pac};

use crate::blink;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::error!("panic: {}", defmt::Display2Format(info));

    let core = unsafe { pac::CorePeripherals::steal() };
    let mut pac = unsafe { pac::Peripherals::steal() };

    // Bridge first: stop all state machines, then take the gate pins away from
    // PIO and pull them low.
    pac.PIO0.ctrl.write(|w| unsafe { w.bits(0) });

    let sio = hal::Sio::new(pac.SIO);
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let _ = pins.gpio14.into_push_pull_output().set_low();
    let _ = pins.gpio15.into_push_pull_output().set_low();
    let _ = pins.gpio16.into_push_pull_output().set_low();
    let _ = pins.gpio17.into_push_pull_output().set_low();
    let _ = pins.gpio18.into_push_pull_output().set_low();

    // Clocks may not be set up if the panic happened early, blinking is just
    // slower then.
    let mut delay = cortex_m::delay::Delay::new(core.SYST, config::CLOCK_RATE);
    let mut led_pin = pins.led.into_push_pull_output();

    blink::blink_signals_loop(&mut led_pin, &mut delay, blink::BlinkCode::Panic);
}
