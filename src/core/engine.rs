use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::CycleConfig;
use crate::core::matrix::PayoffMatrix;
use crate::error::{EngineError, EngineResult, OperationRef};
use crate::models::{CycleStatus, Operation, OperationStatus, Outcome};

/// Running totals obtained by replaying the history up to some index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayCursor {
    /// Wins in the current sub-cycle
    pub wins: u32,
    /// Losses in the current sub-cycle
    pub losses: u32,
    /// Completed sub-cycles (progressive mode only)
    pub sub_cycle: u32,
    /// Bankroll the current sub-cycle is sizing against
    pub amount_at_risk: f64,
    pub balance: f64,
    /// Set once a non-progressive cycle has concluded
    pub off_cycle: bool,
    pub total_wins: u32,
    pub total_losses: u32,
}

impl ReplayCursor {
    fn start(cfg: &CycleConfig) -> Self {
        Self {
            wins: 0,
            losses: 0,
            sub_cycle: 0,
            amount_at_risk: cfg.total_risk,
            balance: cfg.total_risk,
            off_cycle: false,
            total_wins: 0,
            total_losses: 0,
        }
    }

    fn win_rate(&self) -> f64 {
        let resolved = self.total_wins + self.total_losses;
        if resolved == 0 {
            0.0
        } else {
            self.total_wins as f64 / resolved as f64 * 100.0
        }
    }
}

/// Undo token returned by [`CycleEngine::delete_operation`]. Not `Clone`:
/// restoring consumes it, so a deletion can be undone at most once.
#[derive(Debug, PartialEq, Serialize)]
pub struct DeletedOperation {
    operation: Operation,
    index: usize,
    /// Pending operation appended because the delete removed the pending tail
    replacement: Option<u64>,
}

impl DeletedOperation {
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub operations: Vec<Operation>,
    pub cycle_status: CycleStatus,
}

struct Evaluation {
    amount: f64,
    profit: f64,
    balance: f64,
    win_rate: f64,
    status: OperationStatus,
}

/// Owns the operation history of one session and keeps every derived field
/// consistent with the results recorded so far.
#[derive(Debug, Clone)]
pub struct CycleEngine {
    config: CycleConfig,
    matrix: Arc<PayoffMatrix>,
    operations: Vec<Operation>,
    next_id: u64,
}

impl CycleEngine {
    /// Starts a fresh cycle with a single pending operation.
    pub fn new(config: CycleConfig, matrix: Arc<PayoffMatrix>) -> EngineResult<Self> {
        Self::with_operations(config, matrix, Vec::new())
    }

    /// Binds an existing history. Derived fields are recomputed from scratch.
    ///
    /// Only the last operation may lack a result.
    pub fn with_operations(
        config: CycleConfig,
        matrix: Arc<PayoffMatrix>,
        operations: Vec<Operation>,
    ) -> EngineResult<Self> {
        config.validate()?;
        assert_matrix_matches(&matrix, &config);

        if let Some(op) = operations.iter().rev().skip(1).find(|op| op.is_pending()) {
            return Err(EngineError::InvalidConfiguration(format!(
                "operation {} has no result but is not the last operation",
                op.id
            )));
        }

        let next_id = operations.iter().map(|op| op.id).max().map_or(1, |id| id + 1);
        let mut engine = Self {
            config,
            matrix,
            operations,
            next_id,
        };

        if engine.operations.is_empty() {
            engine.reset();
        } else {
            engine.recalculate_from(0);
            engine.normalize_tail();
        }
        Ok(engine)
    }

    /// Swaps in a new configuration and its matrix, then replays everything.
    pub fn rebind(&mut self, config: CycleConfig, matrix: Arc<PayoffMatrix>) -> EngineResult<()> {
        config.validate()?;
        assert_matrix_matches(&matrix, &config);

        self.config = config;
        self.matrix = matrix;
        self.recalculate_from(0);
        self.normalize_tail();
        Ok(())
    }

    /// Drops the history and seeds one pending operation.
    pub fn reset(&mut self) {
        let id = self.allocate_id();
        self.operations = vec![Operation::pending(id)];
        self.recalculate_from(0);
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn matrix(&self) -> &Arc<PayoffMatrix> {
        &self.matrix
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub fn position_of(&self, id: u64) -> Option<usize> {
        self.operations.iter().position(|op| op.id == id)
    }

    /// Stake of the pending operation, if the cycle is still open.
    pub fn next_stake(&self) -> Option<f64> {
        self.operations
            .last()
            .filter(|op| op.is_pending() && op.status != OperationStatus::OutOfCycle)
            .map(|op| op.amount)
    }

    pub fn is_end_of_subcycle(&self, wins: u32, losses: u32) -> bool {
        wins >= self.config.expected_wins || losses > self.config.max_losses()
    }

    /// Stake for the next operation given the sub-cycle state.
    ///
    /// Panics if the formula leaves `[0, bankroll]`, which means the matrix
    /// and configuration disagree.
    pub fn compute_stake(&self, wins: u32, losses: u32, bankroll: f64, is_final: bool) -> f64 {
        if is_final {
            return bankroll;
        }

        let p = self.config.payout_ratio();
        let next = (wins + losses + 1) as usize;

        let win_branch = if wins + 1 >= self.config.expected_wins {
            Some(1.0)
        } else {
            self.matrix.get(next, wins as usize + 1)
        };
        let loss_branch = self.matrix.get(next, wins as usize);

        let (v1, v2) = match (win_branch, loss_branch) {
            (Some(v1), Some(v2)) => (v1, v2),
            // no sizing information past a terminal state
            _ => return bankroll,
        };

        let stake = (1.0 - p * v1 / (v2 + (p - 1.0) * v1)) * bankroll;

        let tolerance = 1e-9 * bankroll.abs().max(1.0);
        assert!(
            stake >= -tolerance && stake <= bankroll + tolerance,
            "stake {} outside [0, {}] at wins={} losses={}",
            stake,
            bankroll,
            wins,
            losses
        );
        stake.clamp(0.0, bankroll.max(0.0))
    }

    /// Bankroll a progressive sub-cycle starts from. Reinvestment compounds
    /// over the session-wide sub-cycle counter.
    pub fn reinvestment_base(&self, sub_cycle: u32) -> f64 {
        let growth = self.matrix.profit_fraction() * self.config.reinvestment_percent / 100.0;
        self.config.total_risk * (1.0 + growth).powi(sub_cycle as i32)
    }

    pub fn status(&self, cursor: &ReplayCursor, result: Option<Outcome>) -> OperationStatus {
        if cursor.off_cycle && !self.config.progressive_mode {
            return OperationStatus::OutOfCycle;
        }

        let cycle = self.config.progressive_mode.then_some(cursor.sub_cycle + 1);

        if cursor.wins >= self.config.expected_wins {
            OperationStatus::Won { cycle }
        } else if cursor.losses > self.config.max_losses() {
            OperationStatus::Lost { cycle }
        } else if result.is_none() {
            OperationStatus::PickResult
        } else {
            OperationStatus::LossesRemaining {
                remaining: self.config.max_losses() - cursor.losses,
            }
        }
    }

    /// Replays operations `0..index` without touching them.
    pub fn cursor_before(&self, index: usize) -> ReplayCursor {
        let mut cursor = ReplayCursor::start(&self.config);
        for op in &self.operations[..index.min(self.operations.len())] {
            self.step(&mut cursor, op.result);
        }
        cursor
    }

    /// Recomputes amount, profit, balance, win rate and status for every
    /// operation from `index` to the end.
    pub fn recalculate_from(&mut self, index: usize) {
        let index = index.min(self.operations.len());
        debug!(
            "Recalculating from index {} of {}",
            index,
            self.operations.len()
        );

        let mut cursor = self.cursor_before(index);
        for i in index..self.operations.len() {
            let result = self.operations[i].result;
            let evaluation = self.step(&mut cursor, result);
            let op = &mut self.operations[i];
            match evaluation {
                Some(eval) => {
                    op.amount = eval.amount;
                    op.profit = eval.profit;
                    op.balance = eval.balance;
                    op.win_rate = eval.win_rate;
                    op.status = eval.status;
                }
                None => op.status = OperationStatus::OutOfCycle,
            }
        }
    }

    /// Resolves the pending operation and opens the next one when the cycle
    /// continues.
    pub fn mark_result(&mut self, outcome: Outcome) -> EngineResult<CycleStatus> {
        let index = match self.operations.last() {
            Some(op) if op.is_pending() && op.status != OperationStatus::OutOfCycle => {
                self.operations.len() - 1
            }
            _ => return Err(EngineError::CycleClosed),
        };

        self.operations[index].result = Some(outcome);
        self.recalculate_from(index);

        let resolved = &self.operations[index];
        match resolved.status {
            OperationStatus::Won { cycle } | OperationStatus::Lost { cycle } => {
                info!(
                    "Cycle {} closed: {} (balance {:.2})",
                    cycle.unwrap_or(1),
                    resolved.status,
                    resolved.balance
                );
            }
            _ => debug!(
                "Operation {} resolved as {} (stake {:.2}, balance {:.2})",
                resolved.id, outcome, resolved.amount, resolved.balance
            ),
        }

        self.normalize_tail();
        Ok(self.cycle_status())
    }

    /// Corrects the result at `index` and cascades the change downstream.
    pub fn update_operation_result(&mut self, index: usize, outcome: Outcome) -> EngineResult<()> {
        if index >= self.operations.len() {
            return Err(EngineError::OperationNotFound(OperationRef::Index(index)));
        }

        self.operations[index].result = Some(outcome);
        self.recalculate_from(index);
        self.normalize_tail();
        Ok(())
    }

    pub fn delete_operation(&mut self, id: u64) -> EngineResult<DeletedOperation> {
        let index = self
            .position_of(id)
            .ok_or(EngineError::OperationNotFound(OperationRef::Id(id)))?;
        if self.operations.len() <= 1 {
            return Err(EngineError::EmptyHistory);
        }

        let operation = self.operations.remove(index);
        self.recalculate_from(index);
        let replacement = self.normalize_tail();

        debug!("Deleted operation {} at index {}", id, index);
        Ok(DeletedOperation {
            operation,
            index,
            replacement,
        })
    }

    /// Puts a deleted operation back where it was.
    ///
    /// The pending operation appended by the delete is dropped only while it
    /// is still the unresolved tail. A deleted pending operation whose
    /// replacement has since been resolved has nothing left to restore.
    pub fn restore_operation(&mut self, deleted: DeletedOperation) -> EngineResult<()> {
        let replacement_pos = deleted.replacement.and_then(|id| {
            let last = self.operations.len().checked_sub(1)?;
            let op = &self.operations[last];
            (op.id == id && op.is_pending()).then_some(last)
        });

        if deleted.operation.is_pending() && replacement_pos.is_none() {
            debug!(
                "Operation {} superseded by a resolved replacement, nothing to restore",
                deleted.operation.id
            );
            return Ok(());
        }

        let len_after_removal = self.operations.len() - usize::from(replacement_pos.is_some());
        if deleted.index > len_after_removal {
            return Err(EngineError::OperationNotFound(OperationRef::Index(
                deleted.index,
            )));
        }

        let mut from = deleted.index;
        if let Some(pos) = replacement_pos {
            self.operations.remove(pos);
            from = from.min(pos);
        }

        self.next_id = self.next_id.max(deleted.operation.id + 1);
        debug!(
            "Restoring operation {} at index {}",
            deleted.operation.id, deleted.index
        );
        self.operations.insert(deleted.index, deleted.operation);
        self.recalculate_from(from);
        self.normalize_tail();
        Ok(())
    }

    /// Overall status. Progressive sessions are never closed by a sub-cycle
    /// outcome, so they always report active until reset.
    pub fn cycle_status(&self) -> CycleStatus {
        if self.config.progressive_mode {
            return CycleStatus::Active;
        }

        let cursor = self.cursor_before(self.operations.len());
        if !cursor.off_cycle {
            CycleStatus::Active
        } else if cursor.wins >= self.config.expected_wins {
            CycleStatus::Won
        } else {
            CycleStatus::Lost
        }
    }

    pub fn get_result(&self) -> CycleResult {
        CycleResult {
            operations: self.operations.clone(),
            cycle_status: self.cycle_status(),
        }
    }

    fn step(&self, cursor: &mut ReplayCursor, result: Option<Outcome>) -> Option<Evaluation> {
        if cursor.off_cycle {
            return None;
        }

        let is_final = cursor.wins + cursor.losses + 1 >= self.config.operation_count;
        let amount = self.compute_stake(cursor.wins, cursor.losses, cursor.amount_at_risk, is_final);

        let profit = match result {
            None => 0.0,
            Some(Outcome::Win) => {
                cursor.wins += 1;
                cursor.total_wins += 1;
                amount * (self.config.payout_ratio() - 1.0)
            }
            Some(Outcome::Loss) => {
                cursor.losses += 1;
                cursor.total_losses += 1;
                -amount
            }
        };

        cursor.balance += profit;
        cursor.amount_at_risk += profit;

        let win_rate = if result.is_some() {
            cursor.win_rate()
        } else {
            0.0
        };
        let status = self.status(cursor, result);
        let balance = cursor.balance;

        if result.is_some() && self.is_end_of_subcycle(cursor.wins, cursor.losses) {
            self.close_subcycle(cursor);
        }

        Some(Evaluation {
            amount,
            profit,
            balance,
            win_rate,
            status,
        })
    }

    fn close_subcycle(&self, cursor: &mut ReplayCursor) {
        if self.config.progressive_mode {
            cursor.wins = 0;
            cursor.losses = 0;
            cursor.sub_cycle += 1;
            cursor.amount_at_risk = self.reinvestment_base(cursor.sub_cycle);
        } else {
            cursor.off_cycle = true;
        }
    }

    /// Keeps exactly one pending operation at the end of an open cycle and
    /// none after a closed one. Returns the id of an appended operation.
    fn normalize_tail(&mut self) -> Option<u64> {
        let cursor = self.cursor_before(self.operations.len());

        if cursor.off_cycle {
            while self.operations.len() > 1
                && self.operations.last().is_some_and(Operation::is_pending)
            {
                self.operations.pop();
            }
            return None;
        }

        if self.operations.last().is_some_and(Operation::is_pending) {
            return None;
        }

        let id = self.allocate_id();
        self.operations.push(Operation::pending(id));
        self.recalculate_from(self.operations.len() - 1);
        Some(id)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn assert_matrix_matches(matrix: &PayoffMatrix, config: &CycleConfig) {
    assert!(
        matrix.matches(config),
        "payoff matrix (N={}, K={}, P={}) was built for a different configuration (N={}, K={}, P={})",
        matrix.operation_count(),
        matrix.expected_wins(),
        matrix.payout_ratio(),
        config.operation_count,
        config.expected_wins,
        config.payout_ratio()
    );
}
