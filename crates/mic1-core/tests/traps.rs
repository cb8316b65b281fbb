//! Fault reporting, protection, latching and run-control coverage.

#![allow(clippy::pedantic, clippy::nursery)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mic1_core::{
    CancellationToken, CycleOutcome, Engine, EngineConfig, MemOp, Opcode, RunState, StopReason,
    TrapCode, TrapEvent,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;
use tracing_test as _;

const SETSP: u8 = Opcode::Setsp.byte();
const BIPUSH: u8 = Opcode::Bipush.byte();
const POP: u8 = Opcode::Pop.byte();
const GOTO: u8 = Opcode::Goto.byte();
const HALT: u8 = Opcode::Halt.byte();

fn engine_with(config: EngineConfig) -> (Engine, Arc<Mutex<Vec<TrapEvent>>>) {
    let mut engine = Engine::new(EngineConfig {
        unthrottled: true,
        ..config
    })
    .expect("valid config");
    let traps = Arc::new(Mutex::new(Vec::new()));
    {
        let traps = Arc::clone(&traps);
        engine
            .events_mut()
            .on_trap(move |event| traps.lock().expect("lock").push(event.clone()));
    }
    (engine, traps)
}

fn checked_engine() -> (Engine, Arc<Mutex<Vec<TrapEvent>>>) {
    engine_with(EngineConfig::default())
}

#[rstest]
#[case::empty_stack_pop(&[SETSP, 0xFF, 0xFF, POP, HALT], TrapCode::StackUnderflow)]
#[case::push_below_stack(&[SETSP, 0xC0, 0x00, BIPUSH, 1, HALT], TrapCode::StackOverflow)]
#[case::undefined_opcode(&[0xEE], TrapCode::InvalidMicrocodeAddress)]
fn faults_end_the_run_with_exactly_one_trap(#[case] program: &[u8], #[case] expected: TrapCode) {
    let (mut engine, traps) = checked_engine();
    let outcome = engine.run(&CancellationToken::new(), true, 1000, program);

    assert_eq!(outcome.reason, StopReason::Trapped(expected));
    assert_eq!(engine.run_state(), RunState::TrapLatched(expected));
    let traps = traps.lock().expect("lock");
    assert_eq!(traps.len(), 1);
    assert_eq!(traps[0].trap_code, expected);
}

#[test]
fn stack_violation_halts_on_the_same_cycle() {
    let (mut engine, traps) = checked_engine();
    engine.memory_mut().load(0, &[HALT]).expect("fits");
    engine.registers_mut().sp = 0xC000 - 4;

    assert_eq!(engine.step(), CycleOutcome::Trapped(TrapCode::StackOverflow));
    assert_eq!(engine.stats().cycle_count(), 1);

    let traps = traps.lock().expect("lock");
    assert_eq!(traps.len(), 1);
    assert_eq!(traps[0].registers.sp, 0xBFFC);
    assert!(traps[0].information.as_deref().unwrap_or("").contains("0xBFFC"));
}

#[test]
fn stack_write_into_code_segment_latches_write_protection() {
    let (mut engine, traps) = checked_engine();
    let write_low = engine
        .control_store()
        .populated()
        .find(|(_, instruction)| instruction.mem == MemOp::WriteWordLow)
        .map(|(address, _)| address)
        .expect("microprogram writes words");
    engine.registers_mut().mpc = write_low;
    engine.registers_mut().mar = 0x0100;
    engine.registers_mut().mdr = 0x1234_5678;

    assert_eq!(
        engine.step(),
        CycleOutcome::Trapped(TrapCode::WriteProtectionFault)
    );
    assert_eq!(
        engine.run_state(),
        RunState::TrapLatched(TrapCode::WriteProtectionFault)
    );
    assert_eq!(engine.memory().read_word(0x0100), Ok(0), "code left untouched");

    let traps = traps.lock().expect("lock");
    assert_eq!(traps.len(), 1);
    assert_eq!(traps[0].trap_code, TrapCode::WriteProtectionFault);
    assert_eq!(traps[0].registers.mar, 0x0100);
}

#[test]
fn fetch_from_data_needs_permission() {
    let (mut engine, traps) = checked_engine();
    let outcome = engine.run(&CancellationToken::new(), true, 0x4000, &[HALT]);
    assert_eq!(
        outcome.reason,
        StopReason::Trapped(TrapCode::InvalidExecutionRegion)
    );
    assert_eq!(traps.lock().expect("lock").len(), 1);

    let (mut engine, _) = engine_with(EngineConfig {
        allow_execute_from_data: true,
        ..EngineConfig::default()
    });
    let outcome = engine.run(&CancellationToken::new(), true, 0x4000, &[HALT]);
    assert!(outcome.is_success());
}

#[test]
fn fetch_from_stack_needs_permission() {
    let (mut engine, _) = checked_engine();
    let outcome = engine.run(&CancellationToken::new(), true, 0xC000, &[HALT]);
    assert_eq!(
        outcome.reason,
        StopReason::Trapped(TrapCode::InvalidExecutionRegion)
    );

    let (mut engine, _) = engine_with(EngineConfig {
        memory_checking: false,
        ..EngineConfig::default()
    });
    let outcome = engine.run(&CancellationToken::new(), true, 0xC000, &[HALT]);
    assert!(outcome.is_success(), "unchecked memory executes anywhere");
}

#[test]
fn oversized_boot_image_is_a_segmentation_fault() {
    let (mut engine, traps) = checked_engine();
    let outcome = engine.run(&CancellationToken::new(), true, 0xFFFF, &[BIPUSH, 1, HALT]);

    assert_eq!(outcome.reason, StopReason::Trapped(TrapCode::SegmentationFault));
    assert_eq!(outcome.cycles, 0);
    let traps = traps.lock().expect("lock");
    assert_eq!(traps.len(), 1);
    assert!(traps[0].message.contains("boot image"));
}

#[test]
fn latched_trap_requires_reinitialisation() {
    let (mut engine, traps) = checked_engine();
    let cancel = CancellationToken::new();
    engine.run(&cancel, true, 1000, &[0xEE]);

    let again = engine.run(&cancel, false, 1000, &[HALT]);
    assert_eq!(
        again.reason,
        StopReason::Trapped(TrapCode::InvalidMicrocodeAddress)
    );
    assert_eq!(again.cycles, 0);
    assert_eq!(traps.lock().expect("lock").len(), 1, "no second trap event");

    let fresh = engine.run(&cancel, true, 1000, &[HALT]);
    assert!(fresh.is_success());
}

#[test]
fn cancellation_stops_an_endless_loop() {
    let (mut engine, traps) = checked_engine();
    let cancel = CancellationToken::new();
    let remote = cancel.clone();

    let outcome = std::thread::scope(|scope| {
        scope.spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        engine.run(&cancel, true, 1000, &[GOTO, 0xFF, 0xFE])
    });

    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert!(outcome.cycles > 0);
    assert!(traps.lock().expect("lock").is_empty());
    assert_eq!(engine.run_state(), RunState::Running);
}

#[test]
fn start_halted_run_idles_until_resumed() {
    let (mut engine, _) = engine_with(EngineConfig {
        start_halted: true,
        ..EngineConfig::default()
    });
    let switch = engine.halt_switch();
    let cancel = CancellationToken::new();

    let outcome = std::thread::scope(|scope| {
        scope.spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            switch.start();
        });
        engine.run(&cancel, false, 1000, &[HALT])
    });

    assert!(outcome.is_success());
    assert!(engine.stats().idle_time() > Duration::ZERO);
    assert_eq!(outcome.cycles, 5);
}

#[test]
fn idle_run_can_be_cancelled() {
    let (mut engine, _) = engine_with(EngineConfig {
        start_halted: true,
        ..EngineConfig::default()
    });
    let cancel = CancellationToken::new();
    let remote = cancel.clone();

    let outcome = std::thread::scope(|scope| {
        scope.spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        engine.run(&cancel, false, 1000, &[HALT])
    });

    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert_eq!(outcome.cycles, 0);
    assert_eq!(engine.run_state(), RunState::Idle);
}

#[test]
fn perf_reports_arrive_while_running() {
    let mut engine = Engine::new(EngineConfig {
        target_frequency_hz: 3_000,
        ..EngineConfig::default()
    })
    .expect("valid config");
    let cancel = CancellationToken::new();
    let reports = Arc::new(Mutex::new(Vec::new()));
    {
        let cancel = cancel.clone();
        let reports = Arc::clone(&reports);
        engine.events_mut().on_perf(move |event| {
            reports.lock().expect("lock").push(*event);
            cancel.cancel();
        });
    }

    let outcome = engine.run(&cancel, true, 1000, &[GOTO, 0xFF, 0xFE]);

    assert_eq!(outcome.reason, StopReason::Cancelled);
    let reports = reports.lock().expect("lock");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].cycle_delta > 0);
    assert!(reports[0].tick_delta > Duration::ZERO);
}
