use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Parameters of one Masaniello cycle. Immutable for the lifetime of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Bankroll allocated to the cycle
    pub total_risk: f64,
    /// Planned operations in one cycle (N)
    pub operation_count: u32,
    /// Wins needed to close the cycle in profit (K)
    pub expected_wins: u32,
    /// Payout percent per win, e.g. 85 returns stake * 1.85
    pub broker_payout: f64,
    pub progressive_mode: bool,
    /// Percent of the base cycle profit compounded into each new sub-cycle
    pub reinvestment_percent: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            total_risk: 100.0,
            operation_count: 10,
            expected_wins: 4,
            broker_payout: 85.0,
            progressive_mode: false,
            reinvestment_percent: 50.0,
        }
    }
}

impl CycleConfig {
    /// P = 1 + payout/100
    pub fn payout_ratio(&self) -> f64 {
        1.0 + self.broker_payout / 100.0
    }

    /// Losses a cycle absorbs before it is lost.
    pub fn max_losses(&self) -> u32 {
        self.operation_count.saturating_sub(self.expected_wins)
    }

    pub fn validate(&self) -> EngineResult<()> {
        validate_shape(self.operation_count, self.expected_wins, self.payout_ratio())?;

        if !self.total_risk.is_finite() || self.total_risk <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "total risk must be positive, got {}",
                self.total_risk
            )));
        }

        if self.progressive_mode
            && !(1.0..=100.0).contains(&self.reinvestment_percent)
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "reinvestment percent must be within 1..=100, got {}",
                self.reinvestment_percent
            )));
        }

        Ok(())
    }
}

/// Checks the inputs the payoff matrix depends on.
pub(crate) fn validate_shape(
    operation_count: u32,
    expected_wins: u32,
    payout_ratio: f64,
) -> EngineResult<()> {
    if expected_wins < 1 {
        return Err(EngineError::InvalidConfiguration(
            "expected wins must be at least 1".to_string(),
        ));
    }
    if expected_wins > operation_count {
        return Err(EngineError::InvalidConfiguration(format!(
            "expected wins ({}) exceed operation count ({})",
            expected_wins, operation_count
        )));
    }
    if !payout_ratio.is_finite() || payout_ratio <= 1.0 {
        return Err(EngineError::InvalidConfiguration(format!(
            "payout ratio must be greater than 1, got {}",
            payout_ratio
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Cycle defaults for new sessions
    pub cycle: CycleConfig,

    // Session
    pub session_name: String,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let defaults = CycleConfig::default();

        let cycle = CycleConfig {
            total_risk: env("TOTAL_RISK", "100")
                .parse()
                .unwrap_or(defaults.total_risk),
            operation_count: env("OPERATION_COUNT", "10")
                .parse()
                .unwrap_or(defaults.operation_count),
            expected_wins: env("EXPECTED_WINS", "4")
                .parse()
                .unwrap_or(defaults.expected_wins),
            broker_payout: env("BROKER_PAYOUT", "85")
                .parse()
                .unwrap_or(defaults.broker_payout),
            progressive_mode: env("PROGRESSIVE_MODE", "false").to_lowercase() == "true",
            reinvestment_percent: env("REINVESTMENT_PERCENT", "50")
                .parse()
                .unwrap_or(defaults.reinvestment_percent),
        };

        Config {
            cycle,
            session_name: env("SESSION_NAME", "Session 1"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }
}
