//! End-to-end IJVM programs: cycle regressions, opcode semantics and
//! stack-discipline properties.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::sync::{Arc, Mutex};

use mic1_core::{
    CancellationToken, Engine, EngineConfig, ExecutionEventKind, Opcode, RunOutcome, StopReason,
    TrapCode,
};
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;
use tracing_test as _;

const ORIGIN: i32 = 1000;

const SETSP: u8 = Opcode::Setsp.byte();
const BIPUSH: u8 = Opcode::Bipush.byte();
const DUP: u8 = Opcode::Dup.byte();
const POP: u8 = Opcode::Pop.byte();
const SWAP: u8 = Opcode::Swap.byte();
const IADD: u8 = Opcode::Iadd.byte();
const IFEQ: u8 = Opcode::Ifeq.byte();
const IFNE: u8 = Opcode::Ifne.byte();
const GOTO: u8 = Opcode::Goto.byte();
const HALT: u8 = Opcode::Halt.byte();

fn fast_config() -> EngineConfig {
    EngineConfig {
        unthrottled: true,
        detailed_stats: true,
        ..EngineConfig::default()
    }
}

fn run_program(program: &[u8]) -> (Engine, RunOutcome) {
    let mut engine = Engine::new(fast_config()).expect("valid config");
    let outcome = engine.run(&CancellationToken::new(), true, ORIGIN, program);
    (engine, outcome)
}

fn countdown_program() -> Vec<u8> {
    vec![
        SETSP, 0xFF, 0xFF, // 1000
        BIPUSH, 2, // 1003
        DUP,  // 1005
        IFEQ, 0x00, 0x07, // 1006: -> 1015
        BIPUSH, 0xFF, // 1009
        IADD, // 1011
        GOTO, 0xFF, 0xF7, // 1012: -> 1005
        HALT, // 1015
    ]
}

#[test]
fn push_dup_halt_takes_thirty_six_cycles() {
    let (engine, outcome) = run_program(&[SETSP, 0xFF, 0xFF, BIPUSH, 42, DUP, HALT]);

    assert_eq!(outcome.reason, StopReason::Halted);
    assert_eq!(outcome.cycles, 36);
    assert_eq!(engine.stats().cycle_count(), 36);
    assert_eq!(engine.stats().ijvm_cycle_count(), 4);
    assert_eq!(engine.registers().tos, 42);
    assert_eq!(engine.registers().sp, 0xFFF7);
    assert_eq!(engine.memory().read_word(0xFFFB), Ok(42));
    assert_eq!(engine.memory().read_word(0xFFF7), Ok(42));
}

#[test]
fn detailed_stats_attribute_every_cycle_to_an_opcode() {
    let (engine, _) = run_program(&[SETSP, 0xFF, 0xFF, BIPUSH, 42, DUP, HALT]);
    let stats = engine.stats();

    assert_eq!(stats.opcode_cycles(SETSP), 9);
    assert_eq!(stats.opcode_cycles(BIPUSH), 11);
    assert_eq!(stats.opcode_cycles(DUP), 11);
    assert_eq!(stats.opcode_cycles(HALT), 5);
    assert_eq!(stats.opcode_histogram().iter().sum::<u64>(), stats.cycle_count());
}

#[test]
fn countdown_loop_terminates_with_zero_on_top() {
    let (engine, outcome) = run_program(&countdown_program());

    assert!(outcome.is_success());
    assert_eq!(engine.registers().tos, 0);
    assert_eq!(engine.registers().sp, 0xFFFB);
    assert_eq!(engine.registers().pc, 1016);
    assert_eq!(outcome.cycles, 147);
    assert_eq!(engine.stats().ijvm_cycle_count(), 15);
}

#[test]
fn ifne_takes_the_branch_on_non_zero() {
    let (engine, outcome) = run_program(&[
        SETSP, 0xFF, 0xFF, // 1000
        BIPUSH, 7, // 1003
        BIPUSH, 1, // 1005
        IFNE, 0x00, 0x04, // 1007: -> 1013
        BIPUSH, 99, // 1010
        HALT, // 1012
        HALT, // 1013
    ]);

    assert!(outcome.is_success());
    assert_eq!(engine.registers().pc, 1014, "halted at the branch target");
    assert_eq!(engine.registers().tos, 7);
    assert_eq!(engine.registers().sp, 0xFFFB);
}

#[test]
fn pop_discards_and_refreshes_the_cached_top() {
    let (engine, outcome) = run_program(&[BIPUSH, 5, BIPUSH, 6, POP, HALT]);

    assert!(outcome.is_success());
    assert_eq!(engine.registers().sp, 0xFFFB);
    assert_eq!(engine.registers().tos, 5);
}

#[test]
fn popping_the_last_word_leaves_an_empty_stack() {
    let (engine, outcome) = run_program(&[BIPUSH, 9, POP, HALT]);

    assert!(outcome.is_success());
    assert_eq!(engine.registers().sp, 0xFFFF);
    assert_eq!(engine.registers().tos, 0);
}

#[test]
fn ifeq_may_consume_the_only_stack_word() {
    let (engine, outcome) = run_program(&[
        SETSP, 0xFF, 0xFF, // 1000
        BIPUSH, 0, // 1003
        IFEQ, 0x00, 0x04, // 1005: -> 1011
        BIPUSH, 1, // 1008
        HALT, // 1010
        HALT, // 1011
    ]);

    assert!(outcome.is_success());
    assert_eq!(engine.registers().pc, 1012, "branch taken");
    assert_eq!(engine.registers().sp, 0xFFFF);
    assert_eq!(engine.registers().tos, 0);
}

#[test]
fn swap_exchanges_the_two_topmost_words() {
    let (engine, outcome) = run_program(&[BIPUSH, 5, BIPUSH, 6, SWAP, HALT]);

    assert!(outcome.is_success());
    assert_eq!(engine.registers().tos, 5);
    assert_eq!(engine.memory().read_word(0xFFF7), Ok(5));
    assert_eq!(engine.memory().read_word(0xFFFB), Ok(6));
    assert_eq!(engine.registers().sp, 0xFFF7);
}

#[rstest]
#[case(Opcode::Isub, 10, 3, 7)]
#[case(Opcode::Iand, 0b1100, 0b1010, 0b1000)]
#[case(Opcode::Ior, 0b1100, 0b1010, 0b1110)]
#[case(Opcode::Ixor, 0b1100, 0b1010, 0b0110)]
#[case(Opcode::Ishl, 3, 4, 48)]
#[case(Opcode::Ishr, -64, 3, -8)]
#[case(Opcode::Iushr, -1, 28, 0xF)]
fn binary_opcodes_combine_second_with_top(
    #[case] opcode: Opcode,
    #[case] second: i8,
    #[case] top: i8,
    #[case] expected: i32,
) {
    let (engine, outcome) = run_program(&[
        BIPUSH,
        second as u8,
        BIPUSH,
        top as u8,
        opcode.byte(),
        HALT,
    ]);

    assert!(outcome.is_success(), "{opcode} halted");
    assert_eq!(engine.registers().tos, expected);
    assert_eq!(engine.registers().sp, 0xFFFB);
    assert_eq!(engine.memory().read_word(0xFFFB), Ok(expected));
}

#[test]
fn goto_jumps_relative_to_its_offset_byte() {
    let (engine, outcome) = run_program(&[
        GOTO, 0x00, 0x04, // 1000: -> 1006
        BIPUSH, 1, // 1003
        HALT, // 1005
        BIPUSH, 2, // 1006
        HALT, // 1008
    ]);

    assert!(outcome.is_success());
    assert_eq!(engine.registers().tos, 2);
}

#[test]
fn execution_events_bracket_every_microinstruction() {
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(EngineConfig {
        execution_events: true,
        ..fast_config()
    })
    .expect("valid config");
    {
        let kinds = Arc::clone(&kinds);
        engine
            .events_mut()
            .on_execution(move |event| kinds.lock().expect("lock").push(event.kind));
    }

    let outcome = engine.run(&CancellationToken::new(), false, ORIGIN, &[HALT]);
    assert!(outcome.is_success());

    let kinds = kinds.lock().expect("lock");
    assert_eq!(kinds.first(), Some(&ExecutionEventKind::Started));
    assert_eq!(kinds.last(), Some(&ExecutionEventKind::Halted));
    let started = kinds
        .iter()
        .filter(|kind| **kind == ExecutionEventKind::InstructionStarted)
        .count();
    let ended = kinds
        .iter()
        .filter(|kind| **kind == ExecutionEventKind::InstructionEnded)
        .count();
    assert_eq!(started, 5, "four fetch steps plus the halt slot");
    assert_eq!(ended, 4, "the halt slot never completes");
}

#[test]
fn lifecycle_events_are_sent_without_per_instruction_events() {
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(fast_config()).expect("valid config");
    {
        let kinds = Arc::clone(&kinds);
        engine
            .events_mut()
            .on_execution(move |event| kinds.lock().expect("lock").push(event.kind));
    }

    engine.run(&CancellationToken::new(), false, ORIGIN, &[HALT]);
    assert_eq!(
        *kinds.lock().expect("lock"),
        vec![ExecutionEventKind::Started, ExecutionEventKind::Halted]
    );
}

#[test]
fn halt_is_reported_as_a_single_trap_event() {
    let traps = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(fast_config()).expect("valid config");
    {
        let traps = Arc::clone(&traps);
        engine
            .events_mut()
            .on_trap(move |event| traps.lock().expect("lock").push(event.clone()));
    }

    engine.run(&CancellationToken::new(), false, ORIGIN, &[BIPUSH, 3, HALT]);

    let traps = traps.lock().expect("lock");
    assert_eq!(traps.len(), 1);
    assert_eq!(traps[0].trap_code, TrapCode::Halt);
    assert_eq!(traps[0].registers.tos, 3);
}

#[test]
fn throttled_run_reaches_the_same_state() {
    let mut engine = Engine::new(EngineConfig::default()).expect("valid config");
    let outcome = engine.run(&CancellationToken::new(), true, ORIGIN, &countdown_program());

    assert!(outcome.is_success());
    assert_eq!(outcome.cycles, 147);
    assert_eq!(engine.registers().tos, 0);
}

#[test]
fn independent_engines_run_concurrently() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                let (engine, outcome) = run_program(&countdown_program());
                (outcome, engine.registers().tos)
            })
        })
        .collect();

    for handle in handles {
        let (outcome, tos) = handle.join().expect("worker finished");
        assert_eq!(outcome.cycles, 147);
        assert_eq!(tos, 0);
    }
}

proptest! {
    #[test]
    fn bipush_pushes_any_signed_byte(value in any::<i8>()) {
        let (engine, outcome) = run_program(&[SETSP, 0xFF, 0xFF, BIPUSH, value as u8, HALT]);

        prop_assert!(outcome.is_success());
        prop_assert_eq!(engine.registers().sp, 0xFFFF - 4);
        prop_assert_eq!(engine.registers().tos, i32::from(value));
        prop_assert_eq!(engine.memory().read_word(0xFFFB), Ok(i32::from(value)));
    }

    #[test]
    fn iadd_sums_and_shrinks_the_stack_by_one_word(a in any::<i8>(), b in any::<i8>()) {
        let (engine, outcome) = run_program(&[BIPUSH, a as u8, BIPUSH, b as u8, IADD, HALT]);

        prop_assert!(outcome.is_success());
        prop_assert_eq!(engine.registers().tos, i32::from(a) + i32::from(b));
        prop_assert_eq!(engine.registers().sp, 0xFFFB);
    }

    #[test]
    fn dup_copies_the_top_and_grows_the_stack(value in any::<i8>()) {
        let (engine, outcome) = run_program(&[BIPUSH, value as u8, DUP, HALT]);

        prop_assert!(outcome.is_success());
        prop_assert_eq!(engine.registers().sp, 0xFFF7);
        prop_assert_eq!(engine.memory().read_word(0xFFF7), engine.memory().read_word(0xFFFB));
        prop_assert_eq!(engine.registers().tos, i32::from(value));
    }
}
