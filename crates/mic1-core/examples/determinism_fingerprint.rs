//! Deterministic execution fingerprint used for cross-host comparison.
//!
//! Traces every microinstruction of a fixed program and folds the MPC
//! sequence, the final register file and the stack contents into an FNV-1a
//! hash. Two hosts agree on execution when their fingerprints match.

use std::sync::{Arc, Mutex};

use mic1_core::{CancellationToken, Engine, EngineConfig, ExecutionEventKind, Opcode};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;
use tracing_test as _;

const ORIGIN: i32 = 0x0200;

fn program() -> Vec<u8> {
    vec![
        Opcode::Setsp.byte(),
        0xFF,
        0xFF,
        Opcode::Bipush.byte(),
        0x03,
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
        Opcode::Bipush.byte(),
        0x7F,
        Opcode::Swap.byte(),
        Opcode::Halt.byte(),
    ]
}

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn fingerprint() -> String {
    let mut engine = Engine::new(EngineConfig {
        unthrottled: true,
        execution_events: true,
        ..EngineConfig::default()
    })
    .expect("default config is valid");

    let trace = Arc::new(Mutex::new(Vec::new()));
    {
        let trace = Arc::clone(&trace);
        engine.events_mut().on_execution(move |event| {
            if event.kind == ExecutionEventKind::InstructionStarted {
                trace.lock().expect("trace lock").push(event.mpc);
            }
        });
    }

    let outcome = engine.run(&CancellationToken::new(), true, ORIGIN, &program());
    assert!(outcome.is_success(), "fingerprint program halts");

    let mut hash = 0xCBF2_9CE4_8422_2325_u64;
    for mpc in trace.lock().expect("trace lock").iter() {
        hash_bytes(&mut hash, &mpc.to_be_bytes());
    }
    let registers = engine.registers();
    for value in [
        registers.pc,
        registers.sp,
        registers.tos,
        registers.opc,
        registers.h,
        registers.mar,
        registers.mdr,
    ] {
        hash_bytes(&mut hash, &value.to_be_bytes());
    }
    hash_bytes(&mut hash, &[registers.mbr, registers.current_opcode]);
    for (_, byte) in engine.memory().stack_dump(registers.sp) {
        hash_bytes(&mut hash, &[byte]);
    }
    hash_bytes(&mut hash, &outcome.cycles.to_be_bytes());

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}

#[cfg(test)]
mod tests {
    use super::fingerprint;

    #[test]
    fn fingerprint_is_stable_across_runs() {
        assert_eq!(fingerprint(), fingerprint());
    }
}
