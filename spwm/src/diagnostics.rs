//! Startup dump of both tables before and after the dead-time correction.

use core::fmt;

use crate::deadtime::DeadTime;

/// One line of the dump. `index` is `None` for the sync offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Row {
    pub index: Option<usize>,
    pub raw: [u32; 2],
    pub adjusted: [u32; 2],
}

impl Row {
    /// Index as printed, with -1 standing for the sync offsets.
    pub fn printed_index(&self) -> i32 {
        self.index.map_or(-1, |i| i as i32)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4} {:>8} {:>8} {:>8} {:>8}",
            self.printed_index(),
            self.raw[0],
            self.adjusted[0],
            self.raw[1],
            self.adjusted[1]
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Row {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{=i32} {=u32} {=u32} {=u32} {=u32}",
            self.printed_index(),
            self.raw[0],
            self.adjusted[0],
            self.raw[1],
            self.adjusted[1]
        )
    }
}

/// Rows for already adjusted tables, sync offsets first. The raw values are
/// recovered by adding the correction back.
pub fn rows<'a>(
    tables: [&'a [u32]; 2],
    sync: [u32; 2],
    dead_time: &DeadTime,
) -> impl Iterator<Item = Row> + 'a {
    let correction = dead_time.correction();
    let row = move |index, adjusted: [u32; 2]| Row {
        index,
        raw: adjusted.map(|v| v + correction),
        adjusted,
    };
    let [a, b] = tables;

    core::iter::once(row(None, sync)).chain(
        a.iter()
            .zip(b)
            .enumerate()
            .map(move |(i, (&a, &b))| row(Some(i), [a, b])),
    )
}
