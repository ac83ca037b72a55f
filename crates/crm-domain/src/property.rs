// property.rs
use crate::ids::PropertyId;
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Estado comercial de una propiedad. Sólo el cierre de un deal lo muta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyStatus {
  Available,
  Reserved,
  Sold,
}

impl PropertyStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PropertyStatus::Available => "Available",
      PropertyStatus::Reserved => "Reserved",
      PropertyStatus::Sold => "Sold",
    }
  }
}

impl fmt::Display for PropertyStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PropertyStatus {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Available" => Ok(PropertyStatus::Available),
      "Reserved" => Ok(PropertyStatus::Reserved),
      "Sold" => Ok(PropertyStatus::Sold),
      other => Err(DomainError::UnknownCode { kind: "property status", code: other.to_string() }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
  pub id: PropertyId,
  pub name: String,
  pub site_id: i64,
  pub property_type_id: i64,
  pub unit_no: Option<String>,
  pub size_sqft: Option<f64>,
  pub price: f64,
  pub status: PropertyStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Property {
  pub fn new(name: impl Into<String>, site_id: i64, property_type_id: i64, price: f64) -> Self {
    let now = Utc::now();
    Self { id: 0,
           name: name.into(),
           site_id,
           property_type_id,
           unit_no: None,
           size_sqft: None,
           price,
           status: PropertyStatus::Available,
           created_at: now,
           updated_at: now }
  }

  pub fn validate(&self) -> Result<(), DomainError> {
    if self.name.trim().is_empty() || self.price <= 0.0 || self.site_id <= 0 || self.property_type_id <= 0 {
      return Err(DomainError::ValidationError("name, price, site_id, and property_type_id are required fields".to_string()));
    }
    Ok(())
  }
}
