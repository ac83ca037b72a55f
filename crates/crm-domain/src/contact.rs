// contact.rs
use crate::ids::{ContactId, UserId};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persona registrada en el CRM. La crea Recepción; un agente la ve cuando
/// tiene un lead asignado sobre ella.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
  pub id: ContactId,
  pub first_name: String,
  pub last_name: String,
  pub email: Option<String>,
  pub primary_phone: String,
  pub created_by: Option<UserId>,
  pub created_at: DateTime<Utc>,
}

impl Contact {
  pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, primary_phone: impl Into<String>) -> Self {
    Self { id: 0,
           first_name: first_name.into(),
           last_name: last_name.into(),
           email: None,
           primary_phone: primary_phone.into(),
           created_by: None,
           created_at: Utc::now() }
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }

  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name).trim().to_string()
  }

  pub fn validate(&self) -> Result<(), DomainError> {
    if self.first_name.trim().is_empty() {
      return Err(DomainError::ValidationError("first_name is required".to_string()));
    }
    if self.primary_phone.trim().is_empty() {
      return Err(DomainError::ValidationError("primary_phone is required".to_string()));
    }
    Ok(())
  }
}
