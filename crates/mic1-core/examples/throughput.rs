//! Throughput harness for the microprogrammed engine.
//!
//! Runs independent unthrottled engines on several threads, each repeatedly
//! executing a small IJVM program, and reports the aggregate microcycle rate.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p mic1-core --release --example throughput
//! ```
//!
//! ## Metrics
//!
//! - Microcycles per second
//! - IJVM instructions per second
//! - Engine-equivalents at the default 1 MHz clock

#![allow(clippy::pedantic)]

use mic1_core::{
    CancellationToken, Engine, EngineConfig, Opcode, DEFAULT_TARGET_FREQUENCY_HZ,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;
use tracing_test as _;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const NUM_THREADS: usize = 4;
const ORIGIN: i32 = 0x0100;

#[derive(Debug, Clone, Copy)]
struct BenchmarkResult {
    name: &'static str,
    cycles_per_second: f64,
    instructions_per_second: f64,
    engines_at_default_clock: f64,
}

/// Counts `n` down to zero, pushing and popping on every iteration.
fn countdown(n: i8) -> Vec<u8> {
    vec![
        Opcode::Bipush.byte(),
        n as u8,
        Opcode::Dup.byte(),
        Opcode::Ifeq.byte(),
        0x00,
        0x07,
        Opcode::Bipush.byte(),
        0xFF,
        Opcode::Iadd.byte(),
        Opcode::Goto.byte(),
        0xFF,
        0xF7,
        Opcode::Halt.byte(),
    ]
}

/// Shuffles two words through every binary operator above a sentinel word.
fn alu_mix() -> Vec<u8> {
    let mut program = vec![Opcode::Bipush.byte(), 0x00];
    for opcode in [
        Opcode::Iadd,
        Opcode::Isub,
        Opcode::Iand,
        Opcode::Ior,
        Opcode::Ixor,
        Opcode::Ishl,
        Opcode::Ishr,
        Opcode::Iushr,
    ] {
        program.extend_from_slice(&[
            Opcode::Bipush.byte(),
            0x35,
            Opcode::Bipush.byte(),
            0x03,
            Opcode::Swap.byte(),
            opcode.byte(),
            Opcode::Pop.byte(),
        ]);
    }
    program.push(Opcode::Halt.byte());
    program
}

fn benchmark(name: &'static str, program: Vec<u8>, duration: Duration) -> BenchmarkResult {
    let (tx, rx) = mpsc::channel();

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let tx = tx.clone();
            let program = program.clone();
            thread::spawn(move || {
                let config = EngineConfig {
                    unthrottled: true,
                    ..EngineConfig::default()
                };
                let Ok(mut engine) = Engine::new(config) else {
                    return;
                };
                let cancel = CancellationToken::new();

                let mut total_cycles = 0u64;
                let mut total_instructions = 0u64;
                let start = Instant::now();

                while start.elapsed() < duration {
                    let outcome = engine.run(&cancel, true, ORIGIN, &program);
                    if !outcome.is_success() {
                        break;
                    }
                    total_cycles += outcome.cycles;
                    total_instructions += engine.stats().ijvm_cycle_count();
                }

                tx.send((total_cycles, total_instructions)).ok();
            })
        })
        .collect();

    for h in handles {
        h.join().ok();
    }

    drop(tx);

    let mut total_cycles = 0u64;
    let mut total_instructions = 0u64;
    for (cycles, instructions) in rx {
        total_cycles += cycles;
        total_instructions += instructions;
    }

    let elapsed_secs = duration.as_secs_f64();
    let cycles_per_second = total_cycles as f64 / elapsed_secs;
    BenchmarkResult {
        name,
        cycles_per_second,
        instructions_per_second: total_instructions as f64 / elapsed_secs,
        engines_at_default_clock: cycles_per_second / f64::from(DEFAULT_TARGET_FREQUENCY_HZ),
    }
}

fn format_number(n: f64) -> String {
    if n >= 1_000_000_000.0 {
        format!("{:.2}B", n / 1_000_000_000.0)
    } else if n >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.2}K", n / 1_000.0)
    } else {
        format!("{n:.2}")
    }
}

fn print_results(results: &[BenchmarkResult]) {
    println!("MIC-1 engine throughput ({NUM_THREADS} threads)");
    println!("{:-<64}", "");
    println!(
        "{:<12} {:>16} {:>16} {:>16}",
        "program", "cycles/s", "instr/s", "engines @1MHz"
    );
    for result in results {
        println!(
            "{:<12} {:>16} {:>16} {:>16}",
            result.name,
            format_number(result.cycles_per_second),
            format_number(result.instructions_per_second),
            format_number(result.engines_at_default_clock)
        );
    }
}

fn main() {
    let warmup = Duration::from_millis(500);
    let benchmark_duration = Duration::from_secs(3);

    println!("Running warmup for {warmup:?}...");
    let _ = benchmark("countdown", countdown(100), warmup);

    println!("Running benchmarks for {benchmark_duration:?} each...\n");
    let results = [
        benchmark("countdown", countdown(100), benchmark_duration),
        benchmark("alu_mix", alu_mix(), benchmark_duration),
    ];
    print_results(&results);
}
