// Archivo: service/tasks.rs
use super::{not_found, CrmService};
use crate::errors::{EngineError, Result};
use crate::guard::{Action, ResourceKind};
use chrono::Utc;
use crm_domain::ids::TaskId;
use crm_domain::{Claims, Task, DEFAULT_TASK_STATUS};
use tracing::info;

impl CrmService {
  /// El asignado debe existir y el vencimiento no puede estar en el pasado.
  pub async fn create_task(&self, claims: &Claims, mut task: Task) -> Result<Task> {
    self.guard.require(claims, Action::Create, ResourceKind::Task, None)?;
    task.validate()?;
    task.validate_due(Utc::now())?;
    if self.stores.users.get_user(task.assigned_to).await?.is_none() {
      return Err(EngineError::validation("invalid assigned_to"));
    }
    if task.status.trim().is_empty() {
      task.status = DEFAULT_TASK_STATUS.to_string();
    }
    task.id = 0;
    let created = self.stores.tasks.create_task(task).await?;
    info!(task_id = created.id, assigned_to = created.assigned_to, user_id = claims.user_id, "task created");
    Ok(created)
  }

  pub async fn get_task(&self, claims: &Claims, id: TaskId) -> Result<Task> {
    let task = self.stores.tasks.get_task(id).await?.ok_or_else(|| not_found("task", id))?;
    self.guard.require(claims, Action::Read, ResourceKind::Task, Some(task.assigned_to))?;
    Ok(task)
  }

  pub async fn list_tasks(&self, claims: &Claims) -> Result<Vec<Task>> {
    self.guard.require(claims, Action::Read, ResourceKind::Task, None)?;
    if self.is_reception(claims) {
      Ok(self.stores.tasks.list_tasks().await?)
    } else {
      Ok(self.stores.tasks.list_tasks_for_user(claims.user_id).await?)
    }
  }

  /// El nuevo asignado también pasa por el guard: un agente no puede
  /// reasignar su tarea a otro usuario.
  pub async fn update_task(&self, claims: &Claims, id: TaskId, incoming: Task) -> Result<Task> {
    let existing = self.stores.tasks.get_task(id).await?.ok_or_else(|| not_found("task", id))?;
    self.guard.require(claims, Action::Update, ResourceKind::Task, Some(existing.assigned_to))?;
    self.guard.require(claims, Action::Update, ResourceKind::Task, Some(incoming.assigned_to))?;
    incoming.validate()?;
    Ok(self.stores.tasks.update_task(Task { id, created_at: existing.created_at, ..incoming }).await?)
  }

  pub async fn delete_task(&self, claims: &Claims, id: TaskId) -> Result<()> {
    self.guard.require(claims, Action::Delete, ResourceKind::Task, None)?;
    Ok(self.stores.tasks.delete_task(id).await?)
  }
}
