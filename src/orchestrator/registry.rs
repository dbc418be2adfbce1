//! 任务登记表
//!
//! 进程内共享；每个任务只由绑定它的执行任务写入，读取得到一致快照

use dashmap::DashMap;

use crate::error::OrchestratorError;
use crate::models::{EmissionTask, TaskId, TaskStatus};

#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, EmissionTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: EmissionTask) {
        self.tasks.insert(task.id, task);
    }

    /// 当前状态的完整副本
    pub fn snapshot(&self, id: &TaskId) -> Option<EmissionTask> {
        self.tasks.get(id).map(|entry| entry.value().clone())
    }

    /// 在持有该条目锁的情况下修改任务
    pub fn update<F>(&self, id: &TaskId, apply: F) -> Result<(), OrchestratorError>
    where
        F: FnOnce(&mut EmissionTask) -> Result<(), OrchestratorError>,
    {
        let mut entry = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;
        apply(entry.value_mut())
    }

    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|entry| entry.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::fixtures;
    use crate::models::EmissionPayload;
    use chrono::Utc;

    #[test]
    fn test_update_is_visible_in_snapshot() {
        let registry = TaskRegistry::new();
        let task = EmissionTask::new(EmissionPayload::Document(fixtures::receipt()));
        let id = task.id;
        registry.insert(task);

        registry.update(&id, |task| task.mark_processing(Utc::now())).unwrap();

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Processing);
        assert!(snapshot.started_at.is_some());
        assert_eq!(registry.count_with_status(TaskStatus::Processing), 1);
    }

    #[test]
    fn test_unknown_task() {
        let registry = TaskRegistry::new();
        let id = TaskId::new();
        assert!(registry.snapshot(&id).is_none());
        assert!(matches!(
            registry.update(&id, |_| Ok(())),
            Err(OrchestratorError::NotFound(_))
        ));
    }
}
