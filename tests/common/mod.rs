use masaniello::config::CycleConfig;
use masaniello::core::{CycleEngine, MatrixCache};
use masaniello::models::Outcome;

pub fn config(operation_count: u32, expected_wins: u32) -> CycleConfig {
    CycleConfig {
        total_risk: 100.0,
        operation_count,
        expected_wins,
        broker_payout: 85.0,
        progressive_mode: false,
        reinvestment_percent: 50.0,
    }
}

pub fn progressive(operation_count: u32, expected_wins: u32, reinvestment: f64) -> CycleConfig {
    CycleConfig {
        progressive_mode: true,
        reinvestment_percent: reinvestment,
        ..config(operation_count, expected_wins)
    }
}

pub fn engine(cache: &MatrixCache, cfg: CycleConfig) -> CycleEngine {
    let matrix = cache.get_or_build(&cfg).unwrap();
    CycleEngine::new(cfg, matrix).unwrap()
}

/// Parses a "WLW"-style string.
pub fn outcomes(seq: &str) -> Vec<Outcome> {
    seq.chars()
        .map(|c| Outcome::from_str_loose(&c.to_string()).unwrap())
        .collect()
}
