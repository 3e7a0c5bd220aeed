use std::fmt::Write;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use fugit::NanosDurationU32;
use spwm::deadtime::DeadTime;
use spwm::synth::{synthesize, Synthesis};
use spwm::{diagnostics, sync_out, Leg, Modulation};

/// Computes the switching tables on the host, with the firmware defaults.
#[derive(Parser, Debug)] // requires `derive` feature
#[command()]
struct Args {
    /// Output sine frequency
    #[arg(long, default_value_t = config::SIGNAL_FREQ_HZ)]
    freq: u32,

    /// Carrier to signal frequency ratio, a multiple of 4
    #[arg(long, default_value_t = config::MOD_INDEX_MF)]
    mf: u16,

    /// Sine amplitude relative to the carrier
    #[arg(long, default_value_t = config::MOD_INDEX_MA)]
    ma: f64,

    #[arg(long, default_value_t = config::TICK_NANOS)]
    tick_ns: u32,

    /// In ticks
    #[arg(long, default_value_t = config::DEAD_TIME)]
    dead_time: u32,

    #[arg(long, default_value_t = config::DEADTIME_COMPENSATION)]
    deadtime_compensation: u32,

    #[arg(long, default_value_t = config::EXEC_DELAY_COMPENSATION)]
    exec_compensation: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Both tables before and after dead-time adjustment, sync offsets first
    Dump,
    /// The first entries of one leg as a Rust array literal
    Fixture {
        #[arg(long, default_value_t = 128)]
        count: usize,
        #[arg(long, value_enum, default_value_t = LegArg::A)]
        leg: LegArg,
    },
    /// Timing figures derived from the tables
    Summary,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum LegArg {
    A,
    B,
}

impl From<LegArg> for Leg {
    fn from(leg: LegArg) -> Leg {
        match leg {
            LegArg::A => Leg::A,
            LegArg::B => Leg::B,
        }
    }
}

struct Tables {
    modulation: Modulation,
    dead_time: DeadTime,
    synthesis: Synthesis,
    raw: [Vec<u32>; 2],
    adjusted: [Vec<u32>; 2],
    adjusted_sync: [u32; 2],
}

impl Tables {
    fn compute(args: &Args) -> anyhow::Result<Self> {
        let modulation = Modulation::new(
            args.freq,
            args.mf,
            args.ma,
            NanosDurationU32::from_ticks(args.tick_ns),
        );
        let dead_time = DeadTime::new(
            args.dead_time,
            args.deadtime_compensation,
            args.exec_compensation,
        )?;

        let mut a = vec![0; modulation.table_len()];
        let mut b = vec![0; modulation.table_len()];
        let synthesis = synthesize(&modulation, &mut a, &mut b).context("synthesis failed")?;
        let raw = [a.clone(), b.clone()];

        let mut adjusted_sync = synthesis.sync;
        dead_time
            .adjust([a.as_mut_slice(), b.as_mut_slice()], &mut adjusted_sync)
            .context("dead time adjustment failed")?;

        Ok(Self {
            modulation,
            dead_time,
            synthesis,
            raw,
            adjusted: [a, b],
            adjusted_sync,
        })
    }
}

fn render_dump(tables: &Tables) -> String {
    let mut out = String::from("   i    a raw    a adj    b raw    b adj\n");
    let [a, b] = &tables.adjusted;
    for row in diagnostics::rows([a.as_slice(), b.as_slice()], tables.adjusted_sync, &tables.dead_time) {
        writeln!(out, "{row}").unwrap();
    }
    out
}

fn render_fixture(tables: &Tables, leg: Leg, count: usize) -> anyhow::Result<String> {
    let table = &tables.raw[leg.index()];
    if count > table.len() {
        bail!("leg {leg:?} has only {} entries", table.len());
    }

    let m = &tables.modulation;
    let mut out = String::new();
    writeln!(
        out,
        "/// Leg {leg:?}, {} Hz, mf = {}, ma = {}, {} ns ticks.",
        m.signal_freq_hz,
        m.mf,
        m.ma,
        m.tick.ticks()
    )?;
    writeln!(out, "const LEG_{leg:?}_FIRST_{count}: [u32; {count}] = [")?;
    for chunk in table[..count].chunks(8) {
        let line = chunk
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "    {line}, //")?;
    }
    writeln!(out, "];")?;
    Ok(out)
}

fn render_summary(tables: &Tables) -> String {
    let s = &tables.synthesis;
    let m = &tables.modulation;
    let carrier_hz = 1e9 / (f64::from(m.tick.ticks()) * f64::from(4 * s.quarter_carrier));
    let [sync_a, sync_b] = s.sync;
    let [adj_a, adj_b] = tables.adjusted_sync;

    let mut out = String::new();
    writeln!(out, "signal period      {} ticks", s.signal_period).unwrap();
    writeln!(out, "quarter carrier    {} ticks", s.quarter_carrier).unwrap();
    writeln!(out, "carrier frequency  {carrier_hz:.1} Hz").unwrap();
    writeln!(out, "table length       {}", m.table_len()).unwrap();
    writeln!(out, "sync offsets       {sync_a} {sync_b} (adjusted {adj_a} {adj_b})").unwrap();
    writeln!(
        out,
        "dead time          {} ticks, correction {}",
        tables.dead_time.dead_time(),
        tables.dead_time.correction()
    )
    .unwrap();
    writeln!(
        out,
        "sync out half      {} ticks",
        sync_out::half_period(s.signal_period, &tables.dead_time)
    )
    .unwrap();
    out
}

fn run(args: &Args) -> anyhow::Result<String> {
    let tables = Tables::compute(args)?;
    match args.command {
        Command::Dump => Ok(render_dump(&tables)),
        Command::Fixture { count, leg } => render_fixture(&tables, leg.into(), count),
        Command::Summary => Ok(render_summary(&tables)),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    print!("{}", run(&args)?);
    Ok(())
}
