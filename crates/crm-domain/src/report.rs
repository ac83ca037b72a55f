// report.rs
use crate::ids::{LeadId, SourceId, UserId};
use crate::{DealStatus, LeadStatusCounts, SalesSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fila del reporte de leads por empleado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeLeadRow {
  pub employee_id: UserId,
  pub employee_name: String,
  pub counts: LeadStatusCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeLeadReport {
  pub rows: Vec<EmployeeLeadRow>,
  pub total: LeadStatusCounts,
}

impl EmployeeLeadReport {
  pub fn push(&mut self, row: EmployeeLeadRow) {
    self.total.add(&row.counts);
    self.rows.push(row);
  }
}

/// Fila del reporte de ventas por empleado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSalesRow {
  pub employee_id: UserId,
  pub employee_name: String,
  pub sales: SalesSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSalesReport {
  pub rows: Vec<EmployeeSalesRow>,
  pub total: SalesSummary,
}

impl EmployeeSalesReport {
  pub fn push(&mut self, row: EmployeeSalesRow) {
    self.total.add(&row.sales);
    self.rows.push(row);
  }
}

/// Detalle de un lead con su contacto, origen y asignado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLeadRow {
  pub lead_id: LeadId,
  pub lead_date: DateTime<Utc>,
  pub contact_name: String,
  pub contact_phone: String,
  pub contact_email: Option<String>,
  pub source_id: SourceId,
  pub assigned_employee: String,
  pub lead_status: String,
}

/// Ventas cerradas agrupadas por origen del lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSalesRow {
  pub source_id: SourceId,
  pub sales: SalesSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSalesReport {
  pub rows: Vec<SourceSalesRow>,
  pub total: SalesSummary,
}

impl SourceSalesReport {
  pub fn push(&mut self, row: SourceSalesRow) {
    self.total.add(&row.sales);
    self.rows.push(row);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineStageRow {
  pub stage: DealStatus,
  pub deal_count: u64,
  pub total_amount: f64,
}

impl PipelineStageRow {
  pub fn empty(stage: DealStatus) -> Self {
    Self { stage, deal_count: 0, total_amount: 0.0 }
  }

  pub fn record(&mut self, amount: f64) {
    self.deal_count += 1;
    self.total_amount += amount;
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineTotal {
  pub total_deal_count: u64,
  pub total_deal_amount: f64,
}

/// Deals por etapa (estado), siempre con las tres etapas en orden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealsPipelineReport {
  pub rows: Vec<PipelineStageRow>,
  pub total: PipelineTotal,
}

impl DealsPipelineReport {
  pub fn push(&mut self, row: PipelineStageRow) {
    self.total.total_deal_count += row.deal_count;
    self.total.total_deal_amount += row.total_amount;
    self.rows.push(row);
  }
}
