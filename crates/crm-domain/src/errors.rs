// errors.rs
use thiserror::Error;

/// Nombre de la restricción "a lo sumo un lead abierto por contacto".
pub const OPEN_LEAD_PER_CONTACT: &str = "open_lead_per_contact";
/// Nombre de la restricción de exclusividad de propiedad.
pub const PROPERTY_EXCLUSIVITY: &str = "property_exclusivity";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Código desconocido para {kind}: {code}")]
  UnknownCode { kind: &'static str, code: String },
}

/// Errores del colaborador de persistencia.
///
/// - `Unavailable`: fallo de E/S, pool o mutex envenenado.
/// - `NotFound`: update/delete sobre una fila inexistente.
/// - `UniqueViolation`: restricción de admisión violada en el store.
/// - `Referenced`: borrado rechazado porque otras filas dependen de la entidad.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
  #[error("Store no disponible: {0}")]
  Unavailable(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Restricción única violada: {0}")]
  UniqueViolation(&'static str),
  #[error("Entidad referenciada: {0}")]
  Referenced(String),
}
