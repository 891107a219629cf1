use serde::{Deserialize, Serialize};

use crate::config::CycleConfig;
use crate::core::matrix::PayoffMatrix;

/// What a cycle promises before the first result is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Win percentage the cycle needs, K / N
    pub required_win_rate: f64,
    pub profit_percent: f64,
    pub profit: f64,
    pub target_balance: f64,
}

impl Objective {
    pub fn new(config: &CycleConfig, matrix: &PayoffMatrix) -> Self {
        let required_win_rate = if config.operation_count > 0 {
            config.expected_wins as f64 / config.operation_count as f64 * 100.0
        } else {
            0.0
        };
        let profit_percent = matrix.profit_fraction() * 100.0;
        let profit = config.total_risk * profit_percent / 100.0;

        Self {
            required_win_rate,
            profit_percent,
            profit,
            target_balance: config.total_risk + profit,
        }
    }
}
