use core::convert::Infallible;

use embedded_hal::digital::v2::OutputPin;

const UNIT_MILLIS: u32 = 200;
const REPEAT_PAUSE_MILLIS: u32 = 1500;

/// Failure class shown on the onboard LED once the output is off.
#[derive(Clone, Copy, Debug)]
pub enum BlinkCode {
    Config,
    Synthesis,
    Adjustment,
    Setup,
    Panic,
}

impl BlinkCode {
    // Number of units the LED stays on, 0 = off for one unit
    fn pattern(self) -> &'static [u8] {
        match self {
            BlinkCode::Config => &[1, 0, 1, 0],
            BlinkCode::Synthesis => &[1, 0, 1, 0, 1, 0],
            BlinkCode::Adjustment => &[1, 0, 1, 0, 1, 0, 1, 0],
            BlinkCode::Setup => &[1, 0, 1, 0, 1, 0, 1, 0, 1, 0],
            BlinkCode::Panic => &[
                1, 0, 1, 0, 1, 0, 0, 0, 0, 3, 0, 0, 0, 3, 0, 0, 0, 3, 0, 0, 0, 1, 0, 1, 0, 1, 0, 0,
                0, 0,
            ],
        }
    }
}

fn blink_signals(
    pin: &mut dyn OutputPin<Error = Infallible>,
    delay: &mut cortex_m::delay::Delay,
    pattern: &[u8],
) {
    for &units in pattern {
        let _ = if units != 0 {
            pin.set_high()
        } else {
            pin.set_low()
        };
        delay.delay_ms(UNIT_MILLIS * u32::from(units.max(1)));
    }
    let _ = pin.set_low();
}

pub fn blink_signals_loop(
    pin: &mut dyn OutputPin<Error = Infallible>,
    delay: &mut cortex_m::delay::Delay,
    code: BlinkCode,
) -> ! {
    loop {
        blink_signals(pin, delay, code.pattern());
        delay.delay_ms(REPEAT_PAUSE_MILLIS);
    }
}
