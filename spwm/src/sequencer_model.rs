//! Cycle model of the programs in `firmware/src/spwm.pio`.
//!
//! Only the instructions those programs use are understood. A `jmp x--` onto
//! itself is run in one step, so whole signal periods stay cheap to simulate.

use std::collections::HashMap;

use fugit::NanosDurationU32;

use crate::deadtime::DeadTime;
use crate::sync_out::half_period;
use crate::synth::synthesize;
use crate::Modulation;

const SOURCE: &str = include_str!("../../firmware/src/spwm.pio");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reg {
    X,
    Y,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Pull,
    MovIsr(Reg),
    MovOsr(Reg),
    JmpDec(Reg, usize),
}

#[derive(Clone, Copy, Debug)]
struct Instr {
    op: Op,
    side: u8,
    delay: u64,
}

struct Program {
    code: Vec<Instr>,
    wrap_target: usize,
    wrap: usize,
}

fn reg(name: &str) -> Reg {
    match name {
        "x" | "x--" => Reg::X,
        "y" | "y--" => Reg::Y,
        _ => panic!("unsupported register {name}"),
    }
}

fn number(text: &str) -> u64 {
    match text.strip_prefix("0b") {
        Some(bits) => u64::from_str_radix(bits, 2).unwrap(),
        None => text.parse().unwrap(),
    }
}

fn parse(name: &str) -> Program {
    let mut current = None;
    let mut lines = Vec::new();
    let mut labels = HashMap::new();
    let mut wrap_target = 0;
    let mut wrap = None;

    for line in SOURCE.lines() {
        let line = line.split(';').next().unwrap().trim();
        if let Some(program) = line.strip_prefix(".program") {
            current = Some(program.trim());
            continue;
        }
        if line.is_empty() || current != Some(name) {
            continue;
        }
        match line {
            ".wrap_target" => wrap_target = lines.len(),
            ".wrap" => wrap = Some(lines.len() - 1),
            _ if line.starts_with(".side_set") => {}
            _ if line.ends_with(':') => {
                labels.insert(line.trim_end_matches(':'), lines.len());
            }
            _ => lines.push(line),
        }
    }
    assert!(!lines.is_empty(), "no program {name}");

    let code = lines
        .iter()
        .map(|line| {
            let (line, delay) = match line.split_once('[') {
                Some((rest, delay)) => {
                    let delay = delay.trim_end_matches(']').trim();
                    (rest.trim(), number(delay))
                }
                None => (*line, 0),
            };
            let (body, side) = line.split_once(" side ").unwrap();
            let body = body.replace(',', " ");
            let op = match body.split_whitespace().collect::<Vec<_>>()[..] {
                ["pull", "block"] | ["pull"] => Op::Pull,
                ["mov", dst, "isr"] => Op::MovIsr(reg(dst)),
                ["mov", dst, "osr"] => Op::MovOsr(reg(dst)),
                ["jmp", cond, label] if cond.ends_with("--") => {
                    Op::JmpDec(reg(cond), labels[label])
                }
                _ => panic!("unsupported instruction {body}"),
            };
            Instr {
                op,
                side: number(side.trim()) as u8,
                delay,
            }
        })
        .collect::<Vec<_>>();

    let wrap = wrap.unwrap_or(code.len() - 1);
    Program {
        code,
        wrap_target,
        wrap,
    }
}

struct Machine<'p> {
    program: &'p Program,
    pc: usize,
    x: u32,
    y: u32,
    isr: u32,
    osr: u32,
    fifo: Box<dyn Iterator<Item = u32> + 'p>,
    now: u64,
    /// Side-set value changes as (tick, value)
    edges: Vec<(u64, u8)>,
}

impl<'p> Machine<'p> {
    fn new(program: &'p Program, isr: u32, fifo: impl Iterator<Item = u32> + 'p) -> Self {
        Self {
            program,
            pc: 0,
            x: 0,
            y: 0,
            isr,
            osr: 0,
            fifo: Box::new(fifo),
            now: 0,
            edges: Vec::new(),
        }
    }

    fn register(&mut self, reg: Reg) -> &mut u32 {
        match reg {
            Reg::X => &mut self.x,
            Reg::Y => &mut self.y,
        }
    }

    fn advance(&mut self) {
        self.pc = if self.pc == self.program.wrap {
            self.program.wrap_target
        } else {
            self.pc + 1
        };
    }

    fn step(&mut self) {
        let instr = self.program.code[self.pc];
        if self.edges.last().map(|&(_, side)| side) != Some(instr.side) {
            self.edges.push((self.now, instr.side));
        }

        let executions = match instr.op {
            Op::Pull => {
                self.osr = self.fifo.next().expect("fifo drained");
                self.advance();
                1
            }
            Op::MovIsr(reg) => {
                *self.register(reg) = self.isr;
                self.advance();
                1
            }
            Op::MovOsr(reg) => {
                *self.register(reg) = self.osr;
                self.advance();
                1
            }
            Op::JmpDec(reg, target) if target == self.pc => {
                let count = core::mem::replace(self.register(reg), u32::MAX);
                self.advance();
                u64::from(count) + 1
            }
            Op::JmpDec(reg, target) => {
                let value = self.register(reg);
                let taken = *value != 0;
                *value = value.wrapping_sub(1);
                if taken {
                    self.pc = target;
                } else {
                    self.advance();
                }
                1
            }
        };
        self.now += executions * (1 + instr.delay);
    }

    fn run_until(mut self, end: u64) -> Vec<(u64, u8)> {
        while self.now < end {
            self.step();
        }
        self.edges
    }
}

/// Ticks at which the side-set changes to a value with any bit set.
fn closings(edges: &[(u64, u8)]) -> Vec<u64> {
    edges
        .iter()
        .filter(|&&(_, side)| side != 0)
        .map(|&(tick, _)| tick)
        .collect()
}

struct Setup {
    dead_time: DeadTime,
    signal_period: u32,
    raw: [Vec<u32>; 2],
    raw_sync: [u32; 2],
    adjusted: [Vec<u32>; 2],
    adjusted_sync: [u32; 2],
}

fn configured() -> Setup {
    let modulation = Modulation::new(
        config::SIGNAL_FREQ_HZ,
        config::MOD_INDEX_MF,
        config::MOD_INDEX_MA,
        NanosDurationU32::from_ticks(config::TICK_NANOS),
    );
    let dead_time = DeadTime::new(
        config::DEAD_TIME,
        config::DEADTIME_COMPENSATION,
        config::EXEC_DELAY_COMPENSATION,
    )
    .unwrap();

    let mut a = vec![0; modulation.table_len()];
    let mut b = vec![0; modulation.table_len()];
    let synthesis = synthesize(&modulation, &mut a, &mut b).unwrap();
    let raw = [a.clone(), b.clone()];
    let mut sync = synthesis.sync;
    dead_time.adjust([&mut a[..], &mut b[..]], &mut sync).unwrap();

    Setup {
        dead_time,
        signal_period: synthesis.signal_period,
        raw,
        raw_sync: synthesis.sync,
        adjusted: [a, b],
        adjusted_sync: sync,
    }
}

fn run_leg(name: &str, setup: &Setup, leg: usize, periods: u64) -> Vec<(u64, u8)> {
    let program = parse(name);
    let fifo = core::iter::once(setup.adjusted_sync[leg])
        .chain(setup.adjusted[leg].iter().copied().cycle());
    Machine::new(&program, setup.dead_time.net(), fifo)
        .run_until(periods * u64::from(setup.signal_period))
}

fn run_sync_out(setup: &Setup, periods: u64) -> Vec<(u64, u8)> {
    let program = parse("sync_out");
    let half = half_period(setup.signal_period, &setup.dead_time);
    Machine::new(&program, half, core::iter::empty())
        .run_until(periods * u64::from(setup.signal_period))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_leg_program() {
        let program = parse("spwm_leg_a");
        assert_eq!(program.code.len(), 13);
        assert_eq!(program.wrap_target, 3);
        assert_eq!(program.wrap, 12);
        assert_eq!(program.code[2].op, Op::JmpDec(Reg::Y, 2));
        assert_eq!(program.code[3].op, Op::MovIsr(Reg::X));
        assert_eq!(program.code[5].side, 0b01);
    }

    #[test]
    fn test_leg_switches_on_raw_crossings() {
        let setup = configured();
        for (leg, name) in ["spwm_leg_a", "spwm_leg_b"].into_iter().enumerate() {
            let closings = closings(&run_leg(name, &setup, leg, 3));
            // The first entry is the side-set of the sync delay at tick 0
            assert_eq!(closings[0], 0);
            let closings = &closings[1..];
            let raw = &setup.raw[leg];
            assert!(closings.len() > 2 * raw.len(), "{name}");

            assert_eq!(closings[0], u64::from(setup.raw_sync[leg]), "{name}");
            for (k, pair) in closings.windows(2).enumerate() {
                assert_eq!(
                    pair[1] - pair[0],
                    u64::from(raw[k % raw.len()]),
                    "{name} entry {}",
                    k % raw.len()
                );
            }
            assert_eq!(
                closings[raw.len()] - closings[0],
                u64::from(setup.signal_period),
                "{name}"
            );
        }
    }

    #[test]
    fn test_leg_dead_time() {
        let setup = configured();
        let gaps = run_leg("spwm_leg_a", &setup, 0, 1)
            .windows(2)
            .filter(|pair| pair[0].1 == 0)
            .map(|pair| pair[1].0 - pair[0].0)
            .collect::<Vec<_>>();
        assert!(gaps.len() > setup.raw[0].len() / 2);
        assert!(gaps.iter().all(|&gap| gap == u64::from(config::DEAD_TIME)));
    }

    #[test]
    fn test_sync_out_period() {
        let setup = configured();
        let period = u64::from(setup.signal_period);
        let edges = run_sync_out(&setup, 3);
        assert_eq!(edges[0], (0, 1));
        for (k, &(tick, side)) in edges.iter().enumerate() {
            assert_eq!(tick, k as u64 * period / 2);
            assert_eq!(side, if k % 2 == 0 { 1 } else { 0 });
        }
        assert!(edges.len() >= 6);
    }

    #[test]
    fn test_sync_out_stays_locked_to_legs() {
        let setup = configured();
        let period = u64::from(setup.signal_period);
        let len = setup.raw[0].len();
        let leg = closings(&run_leg("spwm_leg_a", &setup, 0, 4));
        let rises = run_sync_out(&setup, 4)
            .into_iter()
            .filter(|&(_, side)| side == 1)
            .map(|(tick, _)| tick)
            .collect::<Vec<_>>();

        for cycle in 0..3 {
            assert_eq!(rises[cycle], cycle as u64 * period);
            assert_eq!(
                leg[1 + cycle * len] - rises[cycle],
                u64::from(setup.raw_sync[0])
            );
        }
    }
}
