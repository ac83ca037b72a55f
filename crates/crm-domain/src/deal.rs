// deal.rs
use crate::ids::{DealId, LeadId, PropertyId, StageId, UserId};
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStatus {
  #[serde(rename = "Open")]
  Open,
  #[serde(rename = "Closed-Won")]
  ClosedWon,
  #[serde(rename = "Closed-Lost")]
  ClosedLost,
}

impl DealStatus {
  /// Orden de las etapas en el pipeline.
  pub const ALL: [DealStatus; 3] = [DealStatus::Open, DealStatus::ClosedWon, DealStatus::ClosedLost];

  pub fn as_str(&self) -> &'static str {
    match self {
      DealStatus::Open => "Open",
      DealStatus::ClosedWon => "Closed-Won",
      DealStatus::ClosedLost => "Closed-Lost",
    }
  }

  /// Closed-Won y Closed-Lost cierran el proceso de venta.
  pub fn is_terminal(&self) -> bool {
    matches!(self, DealStatus::ClosedWon | DealStatus::ClosedLost)
  }
}

impl fmt::Display for DealStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DealStatus {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Open" => Ok(DealStatus::Open),
      "Closed-Won" => Ok(DealStatus::ClosedWon),
      "Closed-Lost" => Ok(DealStatus::ClosedLost),
      other => Err(DomainError::UnknownCode { kind: "deal status", code: other.to_string() }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
  pub id: DealId,
  pub lead_id: LeadId,
  pub property_id: PropertyId,
  pub stage_id: StageId,
  pub deal_status: DealStatus,
  pub deal_amount: f64,
  pub deal_date: DateTime<Utc>,
  pub closing_date: Option<DateTime<Utc>>,
  pub notes: Option<String>,
  pub created_by: Option<UserId>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Deal {
  pub fn new(lead_id: LeadId, property_id: PropertyId, stage_id: StageId, deal_amount: f64) -> Self {
    let now = Utc::now();
    Self { id: 0,
           lead_id,
           property_id,
           stage_id,
           deal_status: DealStatus::Open,
           deal_amount,
           deal_date: now,
           closing_date: None,
           notes: None,
           created_by: None,
           created_at: now,
           updated_at: now }
  }

  pub fn with_status(mut self, status: DealStatus) -> Self {
    self.deal_status = status;
    self
  }

  pub fn is_open(&self) -> bool {
    !self.deal_status.is_terminal()
  }
}

/// Resumen de ventas cerradas (Closed-Won) de un agente.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
  pub number_of_sales: u64,
  pub total_sales_amount: f64,
}

impl SalesSummary {
  pub fn record(&mut self, amount: f64) {
    self.number_of_sales += 1;
    self.total_sales_amount += amount;
  }

  pub fn add(&mut self, other: &SalesSummary) {
    self.number_of_sales += other.number_of_sales;
    self.total_sales_amount += other.total_sales_amount;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terminal_statuses() {
    assert!(!DealStatus::Open.is_terminal());
    assert!(DealStatus::ClosedWon.is_terminal());
    assert!(DealStatus::ClosedLost.is_terminal());
  }

  #[test]
  fn status_round_trips_through_its_wire_name() {
    for s in [DealStatus::Open, DealStatus::ClosedWon, DealStatus::ClosedLost] {
      assert_eq!(s.as_str().parse::<DealStatus>(), Ok(s));
    }
    assert!("Won".parse::<DealStatus>().is_err());
  }
}
