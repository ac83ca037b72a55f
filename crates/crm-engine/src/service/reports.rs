// Archivo: service/reports.rs
use super::CrmService;
use crate::errors::Result;
use crm_domain::{Claims, DealsPipelineReport, EmployeeLeadReport, EmployeeSalesReport, EmployeeSalesRow, SourceLeadRow,
                 SourceSalesReport};
use tokio_util::sync::CancellationToken;

impl CrmService {
  pub async fn employee_lead_report(&self, claims: &Claims, cancel: &CancellationToken) -> Result<EmployeeLeadReport> {
    self.reports.build_employee_lead_report(claims, cancel).await
  }

  pub async fn employee_sales_report(&self, claims: &Claims, cancel: &CancellationToken) -> Result<EmployeeSalesReport> {
    self.reports.build_employee_sales_report(claims, cancel).await
  }

  pub async fn my_sales_report(&self, claims: &Claims) -> Result<EmployeeSalesRow> {
    self.reports.my_sales_report(claims).await
  }

  pub async fn source_lead_report(&self, claims: &Claims) -> Result<Vec<SourceLeadRow>> {
    self.reports.source_lead_report(claims).await
  }

  pub async fn source_sales_report(&self, claims: &Claims) -> Result<SourceSalesReport> {
    self.reports.source_sales_report(claims).await
  }

  pub async fn deals_pipeline_report(&self, claims: &Claims) -> Result<DealsPipelineReport> {
    self.reports.deals_pipeline_report(claims).await
  }
}
