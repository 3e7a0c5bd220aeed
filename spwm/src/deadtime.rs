//! Fixed latency corrections applied to synthesized durations.
//!
//! The leg program spends `net()` ticks plus a couple of instruction cycles in
//! every dead-time gap, and a few more cycles fetching each duration. Both are
//! taken out of every table entry and sync offset so the switching instants
//! stay where synthesis put them.

use crate::{AdjustError, ConfigError, Leg, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeadTime {
    dead_time: u32,
    instruction_compensation: u32,
    execution_compensation: u32,
}

impl DeadTime {
    pub fn new(
        dead_time: u32,
        instruction_compensation: u32,
        execution_compensation: u32,
    ) -> Result<Self, ConfigError> {
        if dead_time < instruction_compensation {
            return Err(ConfigError::DeadTime {
                dead_time,
                compensation: instruction_compensation,
            });
        }
        Ok(Self {
            dead_time,
            instruction_compensation,
            execution_compensation,
        })
    }

    pub fn dead_time(&self) -> u32 {
        self.dead_time
    }

    /// Loop count loaded into the sequencer for every dead-time gap.
    pub fn net(&self) -> u32 {
        self.dead_time - self.instruction_compensation
    }

    pub fn execution_compensation(&self) -> u32 {
        self.execution_compensation
    }

    /// Amount subtracted from every entry and sync offset.
    pub fn correction(&self) -> u32 {
        self.net() + self.execution_compensation
    }

    /// Applies the correction to both legs in place.
    ///
    /// Nothing is modified unless every value stays positive.
    pub fn adjust(&self, tables: [&mut [u32]; 2], sync: &mut [u32; 2]) -> Result<(), AdjustError> {
        let correction = self.correction();
        for leg in Leg::BOTH {
            let sync_offset = core::iter::once((Slot::SyncOffset, sync[leg.index()]));
            let entries = tables[leg.index()]
                .iter()
                .enumerate()
                .map(|(i, &value)| (Slot::Entry(i), value));
            if let Some((slot, value)) = sync_offset
                .chain(entries)
                .find(|&(_, value)| value <= correction)
            {
                return Err(AdjustError::NonPositive {
                    leg,
                    slot,
                    value,
                    correction,
                });
            }
        }

        for (table, offset) in tables.into_iter().zip(sync.iter_mut()) {
            *offset -= correction;
            for entry in table.iter_mut() {
                *entry -= correction;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dead_time() -> DeadTime {
        DeadTime::new(50, 2, 3).unwrap()
    }

    #[test]
    fn test_correction() {
        let d = dead_time();
        assert_eq!(d.net(), 48);
        assert_eq!(d.correction(), 51);
        assert_eq!(d.execution_compensation(), 3);

        let d = DeadTime::new(2, 2, 0).unwrap();
        assert_eq!(d.net(), 0);
        assert_eq!(d.correction(), 0);
    }

    #[test]
    fn test_rejects_short_dead_time() {
        assert_eq!(
            DeadTime::new(1, 2, 3),
            Err(ConfigError::DeadTime {
                dead_time: 1,
                compensation: 2
            })
        );
    }

    #[test]
    fn test_adjust() {
        let mut a = [3945, 3829, 4021, 3907];
        let mut b = [3868, 3983, 3791, 3907];
        let mut sync = [1944, 1963];
        dead_time().adjust([&mut a[..], &mut b[..]], &mut sync).unwrap();

        assert_eq!(a, [3894, 3778, 3970, 3856]);
        assert_eq!(b, [3817, 3932, 3740, 3856]);
        assert_eq!(sync, [1893, 1912]);
    }

    #[test]
    fn test_adjust_rejects_without_mutation() {
        let mut a = [100, 200, 51, 300];
        let mut b = [100, 200, 300, 400];
        let mut sync = [100, 100];
        assert_eq!(
            dead_time().adjust([&mut a[..], &mut b[..]], &mut sync),
            Err(AdjustError::NonPositive {
                leg: Leg::A,
                slot: Slot::Entry(2),
                value: 51,
                correction: 51
            })
        );
        assert_eq!(a, [100, 200, 51, 300]);
        assert_eq!(b, [100, 200, 300, 400]);
        assert_eq!(sync, [100, 100]);
    }

    #[test]
    fn test_adjust_checks_sync_offsets() {
        let mut a = [100; 4];
        let mut b = [100; 4];
        let mut sync = [100, 10];
        assert_eq!(
            dead_time().adjust([&mut a[..], &mut b[..]], &mut sync),
            Err(AdjustError::NonPositive {
                leg: Leg::B,
                slot: Slot::SyncOffset,
                value: 10,
                correction: 51
            })
        );
        assert_eq!(a, [100; 4]);
        assert_eq!(sync, [100, 10]);
    }

    #[test]
    fn test_adjust_synthesized_tables() {
        use crate::synth::synthesize;
        use crate::Modulation;
        use fugit::NanosDurationU32;

        let m = Modulation::new(50, 256, 0.8, NanosDurationU32::from_ticks(10));
        let mut a = vec![0; m.table_len()];
        let mut b = vec![0; m.table_len()];
        let synthesis = synthesize(&m, &mut a, &mut b).unwrap();
        let (raw_a, raw_b) = (a.clone(), b.clone());
        let mut sync = synthesis.sync;

        dead_time().adjust([&mut a[..], &mut b[..]], &mut sync).unwrap();

        for (raw, adjusted) in raw_a.iter().chain(&raw_b).zip(a.iter().chain(&b)) {
            assert_eq!(*adjusted, raw - 51);
            assert!(*adjusted > 0);
        }
        assert_eq!(sync, [1944 - 51, 1963 - 51]);
    }
}
