use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::config::{validate_shape, CycleConfig};
use crate::error::EngineResult;

/// Payoff coefficients for every live state of a cycle.
///
/// Rows are indexed by operations played (`wins + losses`), columns by wins.
/// A coefficient is the multiplier taking the bankroll held in that state to
/// the balance the cycle guarantees on success. Dead states (more wins still
/// needed than operations left) have no entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffMatrix {
    operation_count: u32,
    expected_wins: u32,
    payout_ratio: f64,
    cells: Vec<Vec<Option<f64>>>,
}

/// Builds the N x K coefficient table bottom-up.
///
/// f(K, y) = 1, f(w, y) = P^(N-y) when every remaining operation must win,
/// otherwise f(w, y) = P*a*b / (a + (P-1)*b) with a the loss branch and b the
/// win branch one operation ahead.
pub fn build_matrix(
    operation_count: u32,
    expected_wins: u32,
    payout_ratio: f64,
) -> EngineResult<PayoffMatrix> {
    validate_shape(operation_count, expected_wins, payout_ratio)?;

    let n = operation_count as usize;
    let k = expected_wins as usize;
    let p = payout_ratio;

    let mut cells: Vec<Vec<Option<f64>>> = vec![vec![None; k]; n];

    for played in (0..n).rev() {
        for wins in 0..k {
            let needed = k - wins;
            let left = n - played;

            let coefficient = if needed > left {
                None
            } else if needed == left {
                Some(p.powi(left as i32))
            } else {
                let loss_branch = lookup(&cells, k, played + 1, wins);
                let win_branch = lookup(&cells, k, played + 1, wins + 1);
                match (loss_branch, win_branch) {
                    (Some(a), Some(b)) => Some(p * a * b / (a + (p - 1.0) * b)),
                    _ => None,
                }
            };
            cells[played][wins] = coefficient;
        }
    }

    debug!(
        "Built payoff matrix N={} K={} P={:.4} -> f(0,0)={:.6}",
        operation_count,
        expected_wins,
        payout_ratio,
        cells[0][0].unwrap_or(f64::NAN)
    );

    Ok(PayoffMatrix {
        operation_count,
        expected_wins,
        payout_ratio,
        cells,
    })
}

fn lookup(cells: &[Vec<Option<f64>>], k: usize, played: usize, wins: usize) -> Option<f64> {
    if wins >= k {
        return Some(1.0);
    }
    cells.get(played).and_then(|row| row.get(wins).copied().flatten())
}

impl PayoffMatrix {
    pub fn for_config(cfg: &CycleConfig) -> EngineResult<Self> {
        build_matrix(cfg.operation_count, cfg.expected_wins, cfg.payout_ratio())
    }

    /// Coefficient for `wins` wins after `played` operations. Reaching the
    /// target reads as 1.0.
    pub fn get(&self, played: usize, wins: usize) -> Option<f64> {
        if played > self.operation_count as usize {
            return None;
        }
        lookup(&self.cells, self.expected_wins as usize, played, wins)
    }

    /// Whole-cycle profit as a fraction of the bankroll, `f(0,0) - 1`.
    pub fn profit_fraction(&self) -> f64 {
        self.get(0, 0).map(|c| c - 1.0).unwrap_or(0.0)
    }

    pub fn operation_count(&self) -> u32 {
        self.operation_count
    }

    pub fn expected_wins(&self) -> u32 {
        self.expected_wins
    }

    pub fn payout_ratio(&self) -> f64 {
        self.payout_ratio
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.cells
    }

    /// True when this table was built for the shape of `cfg`.
    pub fn matches(&self, cfg: &CycleConfig) -> bool {
        self.operation_count == cfg.operation_count
            && self.expected_wins == cfg.expected_wins
            && self.payout_ratio.to_bits() == cfg.payout_ratio().to_bits()
    }
}

/// Cache key. Total risk is excluded; coefficients are ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixKey {
    pub operation_count: u32,
    pub expected_wins: u32,
    payout_bits: u64,
}

impl MatrixKey {
    pub fn from_config(cfg: &CycleConfig) -> Self {
        Self {
            operation_count: cfg.operation_count,
            expected_wins: cfg.expected_wins,
            payout_bits: cfg.payout_ratio().to_bits(),
        }
    }
}

/// Matrices shared across sessions, built once per (N, K, P).
#[derive(Debug, Default)]
pub struct MatrixCache {
    entries: RwLock<HashMap<MatrixKey, Arc<PayoffMatrix>>>,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&self, cfg: &CycleConfig) -> EngineResult<Arc<PayoffMatrix>> {
        let key = MatrixKey::from_config(cfg);

        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        let built = Arc::new(PayoffMatrix::for_config(cfg)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let matrix = entries.entry(key).or_insert(built);
        Ok(Arc::clone(matrix))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
