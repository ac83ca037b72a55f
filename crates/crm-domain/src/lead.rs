// lead.rs
use crate::ids::{ContactId, LeadId, PropertyId, SourceId, UserId};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estados de un lead con sus ids fijos de la tabla `lead_statuses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
  New,
  Contacted,
  Qualified,
  Converted,
  Lost,
}

impl LeadStatus {
  pub const ALL: [LeadStatus; 5] =
    [LeadStatus::New, LeadStatus::Contacted, LeadStatus::Qualified, LeadStatus::Converted, LeadStatus::Lost];

  /// Ids de los estados abiertos (New, Contacted, Qualified).
  pub const OPEN_IDS: [i64; 3] = [1, 2, 3];

  pub fn id(&self) -> i64 {
    match self {
      LeadStatus::New => 1,
      LeadStatus::Contacted => 2,
      LeadStatus::Qualified => 3,
      LeadStatus::Converted => 4,
      LeadStatus::Lost => 5,
    }
  }

  pub fn from_id(id: i64) -> Result<Self, DomainError> {
    Self::ALL.into_iter()
             .find(|s| s.id() == id)
             .ok_or(DomainError::UnknownCode { kind: "lead status", code: id.to_string() })
  }

  pub fn name(&self) -> &'static str {
    match self {
      LeadStatus::New => "New",
      LeadStatus::Contacted => "Contacted",
      LeadStatus::Qualified => "Qualified",
      LeadStatus::Converted => "Converted",
      LeadStatus::Lost => "Lost",
    }
  }

  pub fn is_open(&self) -> bool {
    matches!(self, LeadStatus::New | LeadStatus::Contacted | LeadStatus::Qualified)
  }

  /// Igual que `is_open` pero sobre un id crudo; ids desconocidos no cuentan
  /// como abiertos.
  pub fn is_open_id(id: i64) -> bool {
    Self::OPEN_IDS.contains(&id)
  }
}

impl fmt::Display for LeadStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
  pub id: LeadId,
  pub contact_id: ContactId,
  pub property_id: Option<PropertyId>,
  pub source_id: SourceId,
  pub status_id: i64,
  pub assigned_to: UserId,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Lead {
  pub fn new(contact_id: ContactId, source_id: SourceId, status: LeadStatus, assigned_to: UserId) -> Self {
    let now = Utc::now();
    Self { id: 0,
           contact_id,
           property_id: None,
           source_id,
           status_id: status.id(),
           assigned_to,
           notes: None,
           created_at: now,
           updated_at: now }
  }

  pub fn with_property(mut self, property_id: PropertyId) -> Self {
    self.property_id = Some(property_id);
    self
  }

  pub fn status(&self) -> Result<LeadStatus, DomainError> {
    LeadStatus::from_id(self.status_id)
  }

  pub fn is_open(&self) -> bool {
    LeadStatus::is_open_id(self.status_id)
  }

  /// Propiedad referenciada, ignorando ids no positivos (el cliente envía 0
  /// cuando no hay propiedad).
  pub fn referenced_property(&self) -> Option<PropertyId> {
    self.property_id.filter(|id| *id > 0)
  }
}

/// Conteo de leads por estado, usado por filas de reporte y por totales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadStatusCounts {
  pub new: u64,
  pub contacted: u64,
  pub qualified: u64,
  pub converted: u64,
  pub lost: u64,
}

impl LeadStatusCounts {
  pub fn record(&mut self, status: LeadStatus) {
    self.record_many(status, 1);
  }

  /// Suma `n` leads de un mismo estado (p.ej. desde un `GROUP BY`).
  pub fn record_many(&mut self, status: LeadStatus, n: u64) {
    match status {
      LeadStatus::New => self.new += n,
      LeadStatus::Contacted => self.contacted += n,
      LeadStatus::Qualified => self.qualified += n,
      LeadStatus::Converted => self.converted += n,
      LeadStatus::Lost => self.lost += n,
    }
  }

  pub fn add(&mut self, other: &LeadStatusCounts) {
    self.new += other.new;
    self.contacted += other.contacted;
    self.qualified += other.qualified;
    self.converted += other.converted;
    self.lost += other.lost;
  }

  pub fn total(&self) -> u64 {
    self.new + self.contacted + self.qualified + self.converted + self.lost
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn open_statuses_partition() {
    let open: Vec<_> = LeadStatus::ALL.into_iter().filter(|s| s.is_open()).collect();
    assert_eq!(open, vec![LeadStatus::New, LeadStatus::Contacted, LeadStatus::Qualified]);
    for s in LeadStatus::ALL {
      assert_eq!(s.is_open(), LeadStatus::is_open_id(s.id()));
    }
    assert!(!LeadStatus::is_open_id(42));
  }

  #[test]
  fn unknown_status_id_is_rejected() {
    assert!(LeadStatus::from_id(0).is_err());
    assert_eq!(LeadStatus::from_id(4), Ok(LeadStatus::Converted));
  }

  #[test]
  fn counts_accumulate() {
    let mut a = LeadStatusCounts::default();
    a.record(LeadStatus::New);
    a.record(LeadStatus::Lost);
    let mut total = LeadStatusCounts::default();
    total.add(&a);
    total.add(&a);
    assert_eq!(total.new, 2);
    assert_eq!(total.lost, 2);
    assert_eq!(total.total(), 4);
  }

  #[test]
  fn zero_property_is_not_a_reference() {
    let l = Lead::new(1, 2, LeadStatus::New, 5).with_property(0);
    assert_eq!(l.referenced_property(), None);
  }
}
