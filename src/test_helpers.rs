use std::sync::Arc;

use crate::config::CycleConfig;
use crate::core::engine::CycleEngine;
use crate::core::matrix::PayoffMatrix;
use crate::models::Outcome;

/// Non-progressive cycle with a 100 bankroll and an 85% payout.
pub fn cycle_config(operation_count: u32, expected_wins: u32) -> CycleConfig {
    CycleConfig {
        total_risk: 100.0,
        operation_count,
        expected_wins,
        broker_payout: 85.0,
        progressive_mode: false,
        reinvestment_percent: 50.0,
    }
}

pub fn engine_for(cfg: CycleConfig) -> CycleEngine {
    let matrix = Arc::new(PayoffMatrix::for_config(&cfg).unwrap());
    CycleEngine::new(cfg, matrix).unwrap()
}

/// Fresh engine with `seq` ("W"/"L" characters) recorded in order.
pub fn replay(cfg: CycleConfig, seq: &str) -> CycleEngine {
    let mut engine = engine_for(cfg);
    for c in seq.chars() {
        let outcome = Outcome::from_str_loose(&c.to_string()).unwrap();
        engine.mark_result(outcome).unwrap();
    }
    engine
}
