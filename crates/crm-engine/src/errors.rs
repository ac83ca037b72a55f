// Archivo: errors.rs
// Propósito: errores del motor y el alias Result<T> usado por sus APIs.
use crm_domain::{DomainError, StoreError, OPEN_LEAD_PER_CONTACT, PROPERTY_EXCLUSIVITY};
use thiserror::Error;

pub const MSG_CONTACT_HAS_ACTIVE_LEAD: &str = "contact already has an active lead";
pub const MSG_PROPERTY_COMMITTED: &str = "property already committed";

/// Errores del motor de reglas.
///
/// - `Validation`: entrada mal formada o id referenciado inexistente.
/// - `Forbidden`: el guard denegó la acción.
/// - `BusinessRule`: se rompería un invariante del dominio.
/// - `NotFound`: la entidad principal no existe.
/// - `Store`: fallo opaco del colaborador de persistencia.
/// - `Cancelled`: la operación fue cancelada por el llamador.
/// - `Config`: configuración de arranque inválida o roles sin resolver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
  #[error("Error de validación: {0}")]
  Validation(String),
  #[error("Prohibido: {0}")]
  Forbidden(String),
  #[error("Regla de negocio violada: {0}")]
  BusinessRule(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Error de almacenamiento: {0}")]
  Store(StoreError),
  #[error("Operación cancelada")]
  Cancelled,
  #[error("Error de configuración: {0}")]
  Config(String),
}

/// Tipo de error, para que la capa de handlers traduzca a respuestas sin
/// inspeccionar mensajes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  Validation,
  Forbidden,
  BusinessRule,
  NotFound,
  Store,
  Cancelled,
  Config,
}

impl EngineError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      EngineError::Validation(_) => ErrorKind::Validation,
      EngineError::Forbidden(_) => ErrorKind::Forbidden,
      EngineError::BusinessRule(_) => ErrorKind::BusinessRule,
      EngineError::NotFound(_) => ErrorKind::NotFound,
      EngineError::Store(_) => ErrorKind::Store,
      EngineError::Cancelled => ErrorKind::Cancelled,
      EngineError::Config(_) => ErrorKind::Config,
    }
  }

  pub fn validation(msg: impl Into<String>) -> Self {
    EngineError::Validation(msg.into())
  }

  pub fn business(msg: impl Into<String>) -> Self {
    EngineError::BusinessRule(msg.into())
  }
}

impl From<DomainError> for EngineError {
  fn from(e: DomainError) -> Self {
    match e {
      DomainError::ValidationError(msg) => EngineError::Validation(msg),
      other => EngineError::Validation(other.to_string()),
    }
  }
}

impl From<StoreError> for EngineError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::UniqueViolation(name) if name == OPEN_LEAD_PER_CONTACT => {
        EngineError::BusinessRule(MSG_CONTACT_HAS_ACTIVE_LEAD.to_string())
      }
      StoreError::UniqueViolation(name) if name == PROPERTY_EXCLUSIVITY => {
        EngineError::BusinessRule(MSG_PROPERTY_COMMITTED.to_string())
      }
      StoreError::Referenced(msg) => EngineError::BusinessRule(msg),
      StoreError::NotFound(msg) => EngineError::NotFound(msg),
      other => EngineError::Store(other),
    }
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, EngineError>;
