//! Task ledger — identity and execution status of advisor-proposed tasks.
//!
//! The ledger owns a single [`ExecutionSlot`]: at most one task is
//! `executing` at any time, ledger-wide. A task that reached `executed` can
//! never be begun again; a `failed` one can.

use thiserror::Error;

use workbench_core::{RawTask, Task, TaskId, TaskStatus};

/// Why the ledger refused a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("task {0} is not in the ledger")]
    UnknownTask(TaskId),

    #[error("task {0} is already executing")]
    AlreadyExecuting(TaskId),

    #[error("task {0} was already executed")]
    AlreadyExecuted(TaskId),

    #[error("task {holder} is executing; {requested} must wait")]
    SlotBusy { holder: TaskId, requested: TaskId },

    #[error("task {0} does not hold the execution slot")]
    NotExecuting(TaskId),
}

/// How a remote execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
}

/// The single in-flight execution token.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionSlot {
    holder: Option<TaskId>,
}

impl ExecutionSlot {
    pub fn holder(&self) -> Option<&TaskId> {
        self.holder.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.holder.is_none()
    }

    fn claim(&mut self, id: &TaskId) -> Result<(), LedgerError> {
        match &self.holder {
            Some(holder) if holder == id => Err(LedgerError::AlreadyExecuting(id.clone())),
            Some(holder) => Err(LedgerError::SlotBusy {
                holder: holder.clone(),
                requested: id.clone(),
            }),
            None => {
                self.holder = Some(id.clone());
                Ok(())
            }
        }
    }

    fn release(&mut self, id: &TaskId) -> Result<(), LedgerError> {
        if self.holder.as_ref() != Some(id) {
            return Err(LedgerError::NotExecuting(id.clone()));
        }
        self.holder = None;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TaskLedger {
    tasks: Vec<Task>,
    slot: ExecutionSlot,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `raw`, minting an id if it has none.
    ///
    /// A payload that already carries an id keeps it, and re-admitting a
    /// tracked id returns the tracked task with its current status.
    pub fn admit(&mut self, raw: RawTask) -> Task {
        let id = match raw.id() {
            Some(id) => {
                if let Some(existing) = self.get(id) {
                    return existing.clone();
                }
                id.clone()
            }
            None => TaskId::generate(),
        };
        let task = Task {
            id,
            text: raw.text().to_owned(),
            status: TaskStatus::Proposed,
        };
        self.tasks.push(task.clone());
        task
    }

    /// Move a task to `executing`, claiming the slot.
    pub fn begin_execution(&mut self, id: &TaskId) -> Result<Task, LedgerError> {
        let status = self
            .get(id)
            .map(|task| task.status)
            .ok_or_else(|| LedgerError::UnknownTask(id.clone()))?;
        if status == TaskStatus::Executed {
            return Err(LedgerError::AlreadyExecuted(id.clone()));
        }
        self.slot.claim(id)?;

        let task = self
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownTask(id.clone()))?;
        task.status = TaskStatus::Executing;
        Ok(task.clone())
    }

    /// Settle the in-flight task and release the slot.
    pub fn complete_execution(
        &mut self,
        id: &TaskId,
        outcome: ExecutionOutcome,
    ) -> Result<TaskStatus, LedgerError> {
        self.slot.release(id)?;
        let status = match outcome {
            ExecutionOutcome::Succeeded => TaskStatus::Executed,
            ExecutionOutcome::Failed => TaskStatus::Failed,
        };
        if let Some(task) = self.get_mut(id) {
            task.status = status;
        }
        Ok(status)
    }

    /// Forget every task and free the slot. Remote effects are not undone.
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.slot = ExecutionSlot::default();
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Tasks in admission order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn slot(&self) -> &ExecutionSlot {
        &self.slot
    }

    fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }
}
