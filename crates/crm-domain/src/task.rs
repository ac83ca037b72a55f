// task.rs
use crate::ids::{DealId, LeadId, TaskId, UserId};
use crate::DomainError;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TASK_STATUS: &str = "Pending";

/// Actividad asignada a un usuario. Sólo interesa al motor por su dueño
/// (`assigned_to`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: TaskId,
  pub task_name: String,
  pub task_description: Option<String>,
  pub due_date: DateTime<Utc>,
  pub status: String,
  pub assigned_to: UserId,
  pub lead_id: Option<LeadId>,
  pub deal_id: Option<DealId>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Task {
  pub fn new(task_name: impl Into<String>, due_date: DateTime<Utc>, assigned_to: UserId) -> Self {
    let now = Utc::now();
    Self { id: 0,
           task_name: task_name.into(),
           task_description: None,
           due_date,
           status: DEFAULT_TASK_STATUS.to_string(),
           assigned_to,
           lead_id: None,
           deal_id: None,
           created_at: now,
           updated_at: now }
  }

  pub fn validate(&self) -> Result<(), DomainError> {
    if self.task_name.trim().is_empty() {
      return Err(DomainError::ValidationError("task name is required".to_string()));
    }
    if self.assigned_to <= 0 {
      return Err(DomainError::ValidationError("assigned_to is required".to_string()));
    }
    Ok(())
  }

  /// El vencimiento no puede caer antes del inicio del día de `now`.
  pub fn validate_due(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    if self.due_date < today {
      return Err(DomainError::ValidationError("due date cannot be in the past".to_string()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  #[test]
  fn due_date_earlier_today_is_accepted() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap();
    let morning = Task::new("Llamar", Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap(), 2);
    assert_eq!(morning.validate_due(now), Ok(()));
    let yesterday = Task::new("Llamar", now - Duration::days(1), 2);
    assert_eq!(yesterday.validate_due(now),
               Err(DomainError::ValidationError("due date cannot be in the past".to_string())));
  }

  #[test]
  fn name_and_assignee_are_required() {
    assert!(Task::new("  ", Utc::now(), 2).validate().is_err());
    assert!(Task::new("Visita", Utc::now(), 0).validate().is_err());
  }
}
