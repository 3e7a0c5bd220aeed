//! ON/OFF duration tables from the crossings of a sine reference with a
//! triangular carrier.
//!
//! Time advances in integer ticks and both waves are compared in the fixed-point
//! domain of [`SCALE`]. Only the first quarter of the signal period is searched,
//! which is `mf / 4` carrier cycles. Every carrier cycle is split into four
//! quadrants:
//!
//! | quadrant | carrier      | reference | leg |
//! |----------|--------------|-----------|-----|
//! | first    | falls 1 → 0  | +sine     | A   |
//! | second   | falls 0 → −1 | −sine     | B   |
//! | third    | rises −1 → 0 | −sine     | B   |
//! | fourth   | rises 0 → 1  | +sine     | A   |
//!
//! The remaining three quarters of the period follow from symmetry: the
//! positive half cycle is mirrored about 90°, and leg B runs the same pattern
//! as leg A shifted by half a period.

use core::f64::consts::TAU;
use core::ops::Range;

use crate::{ConfigError, Leg, Modulation, SCALE};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Quadrant {
    First,
    Second,
    Third,
    Fourth,
}

impl Quadrant {
    const ALL: [Quadrant; 4] = [
        Quadrant::First,
        Quadrant::Second,
        Quadrant::Third,
        Quadrant::Fourth,
    ];

    const fn ordinal(self) -> u32 {
        match self {
            Quadrant::First => 0,
            Quadrant::Second => 1,
            Quadrant::Third => 2,
            Quadrant::Fourth => 3,
        }
    }

    /// The leg whose switching instants are found in this quadrant.
    pub const fn leg(self) -> Leg {
        match self {
            Quadrant::First | Quadrant::Fourth => Leg::A,
            Quadrant::Second | Quadrant::Third => Leg::B,
        }
    }

    const fn falling(self) -> bool {
        matches!(self, Quadrant::First | Quadrant::Second)
    }

    const fn inverted(self) -> bool {
        matches!(self, Quadrant::Second | Quadrant::Third)
    }
}

/// A switching instant, in ticks from the start of the signal period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crossing {
    pub cycle: u16,
    pub quadrant: Quadrant,
    pub tick: u32,
}

/// Everything besides the tables that the playback needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Synthesis {
    /// Ticks from period start to the first ON transition, per leg.
    pub sync: [u32; 2],
    pub signal_period: u32,
    pub quarter_carrier: u32,
}

/// Carrier geometry derived from a [`Modulation`].
#[derive(Clone, Copy, Debug)]
pub struct CarrierPlan {
    mf: u16,
    quarter: u32,
    slope: i32,
    signal_period: u32,
    omega: f64,
    ma_scaled: u32,
}

impl CarrierPlan {
    pub fn new(modulation: &Modulation) -> Result<Self, ConfigError> {
        modulation.validate()?;

        // Overflow means the quarter cycle is far below one tick
        let quarter = u64::from(modulation.tick.ticks())
            .checked_mul(u64::from(modulation.signal_freq_hz))
            .and_then(|t| t.checked_mul(u64::from(modulation.mf)))
            .and_then(|t| t.checked_mul(4))
            .map(|carrier_nanos| NANOS_PER_SECOND / carrier_nanos)
            .ok_or(ConfigError::CarrierTooFast)?;
        if quarter == 0 {
            return Err(ConfigError::CarrierTooFast);
        }
        if quarter > SCALE as u64 {
            return Err(ConfigError::CarrierTooSlow);
        }
        let quarter = quarter as u32;

        let signal_period = quarter
            .checked_mul(4)
            .and_then(|carrier| carrier.checked_mul(u32::from(modulation.mf)))
            .ok_or(ConfigError::PeriodOverflow)?;

        Ok(Self {
            mf: modulation.mf,
            quarter,
            slope: SCALE / quarter as i32,
            signal_period,
            omega: TAU / f64::from(signal_period),
            ma_scaled: (modulation.ma * f64::from(SCALE)) as u32,
        })
    }

    pub fn quarter_carrier(&self) -> u32 {
        self.quarter
    }

    pub fn carrier_period(&self) -> u32 {
        4 * self.quarter
    }

    pub fn signal_period(&self) -> u32 {
        self.signal_period
    }

    pub fn quarter_signal(&self) -> u32 {
        self.signal_period / 4
    }

    /// All crossings of the first quarter signal period, in time order.
    pub fn crossings(&self) -> Crossings<'_> {
        Crossings {
            plan: self,
            cycle: 0,
            quadrant: 0,
        }
    }

    /// Carrier-relative ticks covered by `quadrant`.
    pub fn window(&self, quadrant: Quadrant) -> Range<u32> {
        let start = quadrant.ordinal() * self.quarter;
        start..start + self.quarter
    }

    fn reference(&self, tick: u32, inverted: bool) -> i32 {
        let value = (f64::from(self.ma_scaled) * libm::sin(self.omega * f64::from(tick))) as i32;
        if inverted {
            -value
        } else {
            value
        }
    }

    fn carrier(&self, falling: bool, tri: u32) -> i32 {
        if falling {
            SCALE - self.slope * tri as i32
        } else {
            -SCALE + self.slope * (tri - 2 * self.quarter) as i32
        }
    }

    /// Crossing tick of `quadrant` in carrier cycle `cycle`.
    ///
    /// The sampled carrier stops one slope step short of zero at the end of a
    /// quadrant. If the reference stays inside that gap, the crossing is placed
    /// on the last tick of the quadrant, where the continuous carrier meets it.
    fn search(&self, cycle: u16, quadrant: Quadrant) -> u32 {
        let cycle_start = u32::from(cycle) * self.carrier_period();
        let falling = quadrant.falling();
        let inverted = quadrant.inverted();
        let window = self.window(quadrant);

        // Jump to where the carrier meets the reference value at the anchor. The
        // reference is monotonic over the quadrant, so no crossing lies before it.
        let estimate = if falling {
            let anchor = self.reference(cycle_start + self.quarter, inverted);
            ((SCALE - anchor) / self.slope) as u32
        } else {
            let anchor = self.reference(cycle_start + 3 * self.quarter, inverted);
            ((SCALE + anchor) / self.slope) as u32 + 2 * self.quarter
        };

        (estimate.max(window.start)..window.end)
            .find(|&tri| {
                let reference = self.reference(cycle_start + tri, inverted);
                let carrier = self.carrier(falling, tri);
                if falling {
                    reference >= carrier
                } else {
                    carrier >= reference
                }
            })
            .map_or(cycle_start + window.end - 1, |tri| cycle_start + tri)
    }
}

pub struct Crossings<'p> {
    plan: &'p CarrierPlan,
    cycle: u16,
    quadrant: usize,
}

impl Iterator for Crossings<'_> {
    type Item = Crossing;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cycle >= self.plan.mf / 4 {
            return None;
        }
        let cycle = self.cycle;
        let quadrant = Quadrant::ALL[self.quadrant];
        self.quadrant += 1;
        if self.quadrant == Quadrant::ALL.len() {
            self.quadrant = 0;
            self.cycle += 1;
        }

        Some(Crossing {
            cycle,
            quadrant,
            tick: self.plan.search(cycle, quadrant),
        })
    }
}

#[derive(Clone, Copy, Default)]
struct LegTrack {
    synced: bool,
    sync: u32,
    previous: u32,
    slot: usize,
}

impl LegTrack {
    /// Returns the slot and duration to store, or `None` for the leg's first
    /// crossing, which becomes its sync offset.
    fn record(&mut self, tick: u32) -> Option<(usize, u32)> {
        let previous = core::mem::replace(&mut self.previous, tick);
        if !self.synced {
            self.synced = true;
            self.sync = tick;
            return None;
        }
        let slot = self.slot;
        self.slot += 1;
        Some((slot, tick - previous))
    }
}

/// Stores one duration at its four symmetric positions.
///
/// Each table has a positive half `[0, mf - 1)` closed by the midpoint entry
/// `mf - 1`, and a negative half `[mf, 2mf - 1)` closed by the end entry
/// `2mf - 1`. Slot `k` of the searched quarter and its mirror about 90°,
/// `mf - 2 - k`, go into the positive half of `own`; the same pair goes into
/// the negative half of `other`.
fn mirrored_write(own: &mut [u32], other: &mut [u32], mf: usize, slot: usize, duration: u32) {
    let mirror = mf - 2 - slot;
    own[slot] = duration;
    own[mirror] = duration;
    other[mf + slot] = duration;
    other[mf + mirror] = duration;
}

/// Fills `leg_a` and `leg_b` with alternating ON/OFF durations, starting with ON.
///
/// Both tables must hold exactly `2 * mf` entries. Their sums equal the
/// returned signal period.
pub fn synthesize(
    modulation: &Modulation,
    leg_a: &mut [u32],
    leg_b: &mut [u32],
) -> Result<Synthesis, ConfigError> {
    let plan = CarrierPlan::new(modulation)?;
    let expected = modulation.table_len();
    for actual in [leg_a.len(), leg_b.len()] {
        if actual != expected {
            return Err(ConfigError::TableLength { expected, actual });
        }
    }
    let mf = usize::from(modulation.mf);

    let mut tracks = [LegTrack::default(); 2];
    for crossing in plan.crossings() {
        let leg = crossing.quadrant.leg();
        if let Some((slot, duration)) = tracks[leg.index()].record(crossing.tick) {
            let (own, other) = match leg {
                Leg::A => (&mut *leg_a, &mut *leg_b),
                Leg::B => (&mut *leg_b, &mut *leg_a),
            };
            mirrored_write(own, other, mf, slot, duration);
        }
    }

    // The last OFF pulse straddles 90° and is its own mirror image.
    for leg in Leg::BOTH {
        let track = tracks[leg.index()];
        debug_assert_eq!(track.slot, mf / 2 - 1);
        let closing = 2 * (plan.quarter_signal() - track.previous);
        let (own, other) = match leg {
            Leg::A => (&mut *leg_a, &mut *leg_b),
            Leg::B => (&mut *leg_b, &mut *leg_a),
        };
        mirrored_write(own, other, mf, track.slot, closing);
    }

    let sync = tracks.map(|track| track.sync);
    let boundary = sync[0] + sync[1];
    for table in [&mut *leg_a, &mut *leg_b] {
        table[mf - 1] = boundary;
        table[2 * mf - 1] = boundary;
    }

    Ok(Synthesis {
        sync,
        signal_period: plan.signal_period(),
        quarter_carrier: plan.quarter_carrier(),
    })
}
