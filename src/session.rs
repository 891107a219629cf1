use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CycleConfig;
use crate::core::engine::{CycleEngine, DeletedOperation};
use crate::core::matrix::MatrixCache;
use crate::core::objective::Objective;
use crate::error::{EngineError, EngineResult, OperationRef};
use crate::models::{CycleStatus, Operation, Outcome};

/// Serializable view of a session, suitable for whatever store the host uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub config: CycleConfig,
    pub operations: Vec<Operation>,
    pub cycle_status: CycleStatus,
}

/// A named cycle plus the single undo slot for deletions.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    engine: CycleEngine,
    deleted: Option<DeletedOperation>,
}

impl Session {
    pub fn new(id: u64, name: &str, config: CycleConfig, cache: &MatrixCache) -> EngineResult<Self> {
        let matrix = cache.get_or_build(&config)?;
        Ok(Self {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
            engine: CycleEngine::new(config, matrix)?,
            deleted: None,
        })
    }

    /// Rebuilds a session from a snapshot. Derived fields are recomputed, so a
    /// stale snapshot comes back consistent. A history with an unresolved
    /// operation anywhere but last is rejected.
    pub fn restore(snapshot: SessionSnapshot, cache: &MatrixCache) -> EngineResult<Self> {
        let matrix = cache.get_or_build(&snapshot.config)?;
        Ok(Self {
            id: snapshot.id,
            name: snapshot.name,
            created_at: snapshot.created_at,
            engine: CycleEngine::with_operations(snapshot.config, matrix, snapshot.operations)?,
            deleted: None,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let result = self.engine.get_result();
        SessionSnapshot {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            config: *self.engine.config(),
            operations: result.operations,
            cycle_status: result.cycle_status,
        }
    }

    pub fn engine(&self) -> &CycleEngine {
        &self.engine
    }

    pub fn config(&self) -> &CycleConfig {
        self.engine.config()
    }

    pub fn operations(&self) -> &[Operation] {
        self.engine.operations()
    }

    pub fn cycle_status(&self) -> CycleStatus {
        self.engine.cycle_status()
    }

    pub fn objective(&self) -> Objective {
        Objective::new(self.engine.config(), self.engine.matrix())
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn mark_result(&mut self, outcome: Outcome) -> EngineResult<CycleStatus> {
        self.engine.mark_result(outcome)
    }

    pub fn update_result(&mut self, operation_id: u64, outcome: Outcome) -> EngineResult<()> {
        let index = self
            .engine
            .position_of(operation_id)
            .ok_or(EngineError::OperationNotFound(OperationRef::Id(operation_id)))?;
        self.engine.update_operation_result(index, outcome)
    }

    /// Deletes an operation and keeps it for one undo. A later delete replaces
    /// the previous undo.
    pub fn delete_operation(&mut self, operation_id: u64) -> EngineResult<&Operation> {
        let deleted = self.engine.delete_operation(operation_id)?;
        Ok(self.deleted.insert(deleted).operation())
    }

    pub fn pending_undo(&self) -> Option<&Operation> {
        self.deleted.as_ref().map(DeletedOperation::operation)
    }

    pub fn undo_delete(&mut self) -> EngineResult<()> {
        let deleted = self.deleted.take().ok_or(EngineError::EmptyHistory)?;
        self.engine.restore_operation(deleted)
    }

    pub fn reset_cycle(&mut self) {
        info!("Session '{}': cycle reset", self.name);
        self.engine.reset();
        self.deleted = None;
    }

    /// Applies a new configuration, replaying the history against its matrix.
    pub fn update_config(&mut self, config: CycleConfig, cache: &MatrixCache) -> EngineResult<()> {
        config.validate()?;
        let matrix = cache.get_or_build(&config)?;
        self.engine.rebind(config, matrix)?;
        info!(
            "Session '{}': config updated (N={}, K={}, payout {}%)",
            self.name, config.operation_count, config.expected_wins, config.broker_payout
        );
        Ok(())
    }
}
