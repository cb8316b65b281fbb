#![no_main]

use libfuzzer_sys::fuzz_target;
use mic1_core::{CycleOutcome, Engine, EngineConfig, RunState};

const MAX_CYCLES: u32 = 1 << 16;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let Ok(mut engine) = Engine::new(EngineConfig {
        unthrottled: true,
        memory_checking: data[0] & 1 == 1,
        detailed_stats: true,
        ..EngineConfig::default()
    }) else {
        return;
    };

    let start_pc = i32::from(u16::from_be_bytes([data[1], data[2]]));
    if engine.memory_mut().load(start_pc, &data[3..]).is_err() {
        return;
    }
    engine.registers_mut().pc = start_pc;

    for _ in 0..MAX_CYCLES {
        match engine.step() {
            CycleOutcome::Continue => {}
            CycleOutcome::Halted => {
                assert_eq!(engine.run_state(), RunState::Halted);
                break;
            }
            CycleOutcome::Trapped(code) => {
                assert!(!code.is_normal());
                assert_eq!(engine.run_state(), RunState::TrapLatched(code));
                break;
            }
        }
    }

    let stats = engine.stats();
    assert!(stats.opcode_histogram().iter().sum::<u64>() <= stats.cycle_count());
});
