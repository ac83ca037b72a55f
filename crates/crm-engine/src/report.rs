// Archivo: report.rs
// Propósito: reportes por empleado con fan-out concurrente (una tarea por
// agente) y fan-in ordenado. Un fallo individual omite la fila; una
// cancelación descarta el reporte completo.
use crate::config::RoleConfig;
use crate::errors::{EngineError, Result};
use crate::guard::{Action, PermissionGuard, ResourceKind};
use crm_domain::ids::UserId;
use crm_domain::{Claims, DealStore, DealsPipelineReport, EmployeeLeadReport, EmployeeLeadRow, EmployeeSalesReport,
                 EmployeeSalesRow, LeadStore, SourceLeadRow, SourceSalesReport, StoreResult, User, UserStore};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct ReportAggregator {
  guard: PermissionGuard,
  users: Arc<dyn UserStore>,
  leads: Arc<dyn LeadStore>,
  deals: Arc<dyn DealStore>,
}

impl ReportAggregator {
  pub fn new(guard: PermissionGuard,
             users: Arc<dyn UserStore>,
             leads: Arc<dyn LeadStore>,
             deals: Arc<dyn DealStore>)
             -> Self {
    Self { guard, users, leads, deals }
  }

  fn roles(&self) -> RoleConfig {
    self.guard.roles()
  }

  /// Conteo de leads por estado para cada agente de ventas. Sólo Recepción.
  pub async fn build_employee_lead_report(&self, claims: &Claims, cancel: &CancellationToken) -> Result<EmployeeLeadReport> {
    self.guard.require(claims, Action::Read, ResourceKind::Report, None)?;
    let agents = self.sales_agents().await?;
    let leads = self.leads.clone();
    let rows = fan_out(&agents, cancel, move |id| {
                 let leads = leads.clone();
                 async move { leads.count_leads_by_status_for_user(id).await }
               }).await?;

    let mut report = EmployeeLeadReport::default();
    for (agent, counts) in rows {
      report.push(EmployeeLeadRow { employee_id: agent.id, employee_name: agent.username.clone(), counts });
    }
    debug!(rows = report.rows.len(), "employee lead report built");
    Ok(report)
  }

  /// Ventas cerradas por agente, con el mismo contrato de fan-out/fan-in.
  pub async fn build_employee_sales_report(&self, claims: &Claims, cancel: &CancellationToken) -> Result<EmployeeSalesReport> {
    self.guard.require(claims, Action::Read, ResourceKind::Report, None)?;
    let agents = self.sales_agents().await?;
    let deals = self.deals.clone();
    let rows = fan_out(&agents, cancel, move |id| {
                 let deals = deals.clone();
                 async move { deals.sales_summary_for_user(id).await }
               }).await?;

    let mut report = EmployeeSalesReport::default();
    for (agent, sales) in rows {
      report.push(EmployeeSalesRow { employee_id: agent.id, employee_name: agent.username.clone(), sales });
    }
    debug!(rows = report.rows.len(), "employee sales report built");
    Ok(report)
  }

  /// Resumen de ventas propio del actor.
  pub async fn my_sales_report(&self, claims: &Claims) -> Result<EmployeeSalesRow> {
    self.guard.require(claims, Action::Read, ResourceKind::Report, Some(claims.user_id))?;
    let user = self.users
                   .get_user(claims.user_id)
                   .await?
                   .ok_or_else(|| EngineError::NotFound(format!("user {}", claims.user_id)))?;
    let sales = self.deals.sales_summary_for_user(user.id).await?;
    Ok(EmployeeSalesRow { employee_id: user.id, employee_name: user.username, sales })
  }

  /// Detalle de leads con contacto, origen y asignado. Sólo Recepción.
  pub async fn source_lead_report(&self, claims: &Claims) -> Result<Vec<SourceLeadRow>> {
    self.guard.require(claims, Action::Read, ResourceKind::Report, None)?;
    let rows = self.leads.source_lead_rows().await?;
    info!(rows = rows.len(), "source lead report built");
    Ok(rows)
  }

  /// Ventas cerradas por origen del lead. Sólo Recepción.
  pub async fn source_sales_report(&self, claims: &Claims) -> Result<SourceSalesReport> {
    self.guard.require(claims, Action::Read, ResourceKind::Report, None)?;
    let mut report = SourceSalesReport::default();
    for row in self.deals.sales_by_source().await? {
      report.push(row);
    }
    info!(rows = report.rows.len(), "source sales report built");
    Ok(report)
  }

  /// Pipeline de deals por etapa. Recepción ve todos los deals; un agente,
  /// sólo los que creó.
  pub async fn deals_pipeline_report(&self, claims: &Claims) -> Result<DealsPipelineReport> {
    let created_by = if self.guard.is_reception(claims) { None } else { Some(claims.user_id) };
    self.guard.require(claims, Action::Read, ResourceKind::Report, created_by)?;
    let mut report = DealsPipelineReport::default();
    for row in self.deals.deal_pipeline(created_by).await? {
      report.push(row);
    }
    info!(deals = report.total.total_deal_count, scoped = created_by.is_some(), "deals pipeline report built");
    Ok(report)
  }

  async fn sales_agents(&self) -> Result<Vec<User>> {
    let role_id = self.roles().sales_agent_id;
    Ok(self.users
           .list_users_by_role(role_id)
           .await
           .inspect_err(|e| error!(role_id, error = %e, "listing sales agents failed"))?)
  }
}

/// Lanza una tarea por agente y devuelve los resultados exitosos en el orden
/// de `agents`. Los fallos individuales se registran y se omiten.
async fn fan_out<'a, T, F, Fut>(agents: &'a [User], cancel: &CancellationToken, fetch: F) -> Result<Vec<(&'a User, T)>>
  where T: Send + 'static,
        F: Fn(UserId) -> Fut,
        Fut: Future<Output = StoreResult<T>> + Send + 'static
{
  let mut set = JoinSet::new();
  for (idx, agent) in agents.iter().enumerate() {
    let token = cancel.clone();
    let query = fetch(agent.id);
    set.spawn(async move {
         let outcome = tokio::select! {
           biased;
           _ = token.cancelled() => None,
           res = query => Some(res),
         };
         (idx, outcome)
       });
  }

  let mut slots: Vec<Option<T>> = agents.iter().map(|_| None).collect();
  while let Some(joined) = set.join_next().await {
    match joined {
      Ok((idx, Some(Ok(value)))) => slots[idx] = Some(value),
      Ok((idx, Some(Err(e)))) => error!(agent_id = agents[idx].id, error = %e, "report query failed; row omitted"),
      Ok((_, None)) => {}
      Err(join_err) => error!(error = %join_err, "report task aborted; row omitted"),
    }
  }

  if cancel.is_cancelled() {
    warn!(agents = agents.len(), "report cancelled during fan-out");
    return Err(EngineError::Cancelled);
  }

  Ok(agents.iter().zip(slots).filter_map(|(agent, slot)| slot.map(|v| (agent, v))).collect())
}
