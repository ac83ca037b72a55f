// user.rs
use crate::ids::{RoleId, UserId};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usuario del sistema. Las credenciales se gestionan fuera del motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: UserId,
  pub username: String,
  pub email: String,
  pub role_id: RoleId,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn new(username: impl Into<String>, email: impl Into<String>, role_id: RoleId) -> Self {
    Self { id: 0, username: username.into(), email: email.into(), role_id, created_at: Utc::now() }
  }

  pub fn validate(&self) -> Result<(), DomainError> {
    let len = self.username.chars().count();
    if !(3..=50).contains(&len) {
      return Err(DomainError::ValidationError("username must be between 3 and 50 characters".to_string()));
    }
    if !self.email.contains('@') {
      return Err(DomainError::ValidationError("email is invalid".to_string()));
    }
    if self.role_id <= 0 {
      return Err(DomainError::ValidationError("role_id is required".to_string()));
    }
    Ok(())
  }
}
