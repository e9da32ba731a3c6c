//! Workflow-scoped tracing.
//!
//! Analysis and generation run as background tasks, so every event they
//! emit carries the workflow id and the task name to be told apart.

use std::fmt::Display;

use tracing::{error, info, info_span, warn, Span};
use uuid::Uuid;

/// Tags log events with the workflow and task they belong to.
#[derive(Debug, Clone)]
pub struct WorkflowLogger {
    workflow_id: Uuid,
    task: &'static str,
}

impl WorkflowLogger {
    pub fn new(workflow_id: Uuid) -> Self {
        Self {
            workflow_id,
            task: "workflow",
        }
    }

    /// Same workflow, scoped to one task ("analysis", "generation").
    pub fn task(&self, task: &'static str) -> Self {
        Self {
            workflow_id: self.workflow_id,
            task,
        }
    }

    pub fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }

    pub fn started(&self, detail: &str) {
        info!(workflow_id = %self.workflow_id, task = self.task, detail, "Task started");
    }

    pub fn progress(&self, message: &str) {
        info!(workflow_id = %self.workflow_id, task = self.task, message, "Task progress");
    }

    pub fn finished(&self, detail: &str) {
        info!(workflow_id = %self.workflow_id, task = self.task, detail, "Task finished");
    }

    pub fn failed(&self, err: &dyn Display) {
        error!(workflow_id = %self.workflow_id, task = self.task, error = %err, "Task failed");
    }

    /// A user action that could not be carried out.
    pub fn rejected(&self, reason: &dyn Display) {
        warn!(
            workflow_id = %self.workflow_id,
            task = self.task,
            reason = %reason,
            "Action rejected"
        );
    }

    /// Span wrapping one background task.
    pub fn span(&self) -> Span {
        info_span!("workflow_task", workflow_id = %self.workflow_id, task = self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_keeps_workflow_id() {
        let id = Uuid::new_v4();
        let analysis = WorkflowLogger::new(id).task("analysis");

        assert_eq!(analysis.workflow_id(), id);
        assert_eq!(analysis.task, "analysis");
        assert_eq!(analysis.task("generation").workflow_id(), id);
    }
}
