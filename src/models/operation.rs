use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
        }
    }

    /// Accepts "W"/"L" as well as the full words, case-insensitive.
    pub fn from_str_loose(s: &str) -> Option<Outcome> {
        match s.trim().to_lowercase().as_str() {
            "w" | "win" | "itm" => Some(Outcome::Win),
            "l" | "loss" | "otm" => Some(Outcome::Loss),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Active,
    Won,
    Lost,
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleStatus::Active => write!(f, "active"),
            CycleStatus::Won => write!(f, "won"),
            CycleStatus::Lost => write!(f, "lost"),
        }
    }
}

/// Derived, human-facing state of one operation.
///
/// `cycle` is the 1-based sub-cycle number and is only set in progressive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationStatus {
    PickResult,
    LossesRemaining { remaining: u32 },
    Won { cycle: Option<u32> },
    Lost { cycle: Option<u32> },
    OutOfCycle,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::PickResult => write!(f, "pick a result"),
            OperationStatus::LossesRemaining { remaining } => {
                write!(f, "{} losses remaining", remaining)
            }
            OperationStatus::Won { cycle: Some(n) } => write!(f, "you have won cycle {}", n),
            OperationStatus::Won { cycle: None } => write!(f, "you have won the cycle"),
            OperationStatus::Lost { cycle: Some(n) } => write!(f, "you have lost cycle {}", n),
            OperationStatus::Lost { cycle: None } => write!(f, "you have lost the cycle"),
            OperationStatus::OutOfCycle => write!(f, "out of cycle"),
        }
    }
}

/// One entry of the cycle history. Every field except `id` and `result` is
/// recomputed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: u64,
    /// `None` while pending
    pub result: Option<Outcome>,
    pub amount: f64,
    pub profit: f64,
    pub balance: f64,
    pub win_rate: f64,
    pub status: OperationStatus,
}

impl Operation {
    pub fn pending(id: u64) -> Self {
        Self {
            id,
            result: None,
            amount: 0.0,
            profit: 0.0,
            balance: 0.0,
            win_rate: 0.0,
            status: OperationStatus::PickResult,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}
