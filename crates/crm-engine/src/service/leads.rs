// Archivo: service/leads.rs
use super::{not_found, CrmService};
use crate::errors::Result;
use crate::guard::{Action, ResourceKind};
use crm_domain::ids::LeadId;
use crm_domain::{Claims, Lead};
use tracing::info;

impl CrmService {
  /// Guard primero: la validación nunca corre para un actor no autorizado.
  /// El store re-verifica la admisión de forma atómica al insertar.
  pub async fn create_lead(&self, claims: &Claims, mut lead: Lead) -> Result<Lead> {
    self.guard.require(claims, Action::Create, ResourceKind::Lead, None)?;
    self.lead_validator.validate_create(&lead).await?;
    lead.id = 0;
    lead.property_id = lead.referenced_property();
    let created = self.stores.leads.create_lead(lead).await?;
    info!(lead_id = created.id,
          contact_id = created.contact_id,
          property_id = ?created.property_id,
          user_id = claims.user_id,
          "lead created");
    Ok(created)
  }

  pub async fn get_lead(&self, claims: &Claims, id: LeadId) -> Result<Lead> {
    let lead = self.stores.leads.get_lead(id).await?.ok_or_else(|| not_found("lead", id))?;
    self.guard.require(claims, Action::Read, ResourceKind::Lead, Some(lead.assigned_to))?;
    Ok(lead)
  }

  pub async fn list_leads(&self, claims: &Claims) -> Result<Vec<Lead>> {
    self.guard.require(claims, Action::Read, ResourceKind::Lead, None)?;
    if self.is_reception(claims) {
      Ok(self.stores.leads.list_leads().await?)
    } else {
      Ok(self.stores.leads.list_leads_for_user(claims.user_id).await?)
    }
  }

  pub async fn update_lead(&self, claims: &Claims, id: LeadId, incoming: Lead) -> Result<Lead> {
    let existing = self.stores.leads.get_lead(id).await?.ok_or_else(|| not_found("lead", id))?;
    self.guard.require(claims, Action::Update, ResourceKind::Lead, Some(existing.assigned_to))?;
    let prepared = self.lead_validator.validate_update(&existing, &incoming, claims).await?;
    let updated = self.stores.leads.update_lead(prepared).await?;
    info!(lead_id = updated.id, status_id = updated.status_id, user_id = claims.user_id, "lead updated");
    Ok(updated)
  }

  pub async fn delete_lead(&self, claims: &Claims, id: LeadId) -> Result<()> {
    self.guard.require(claims, Action::Delete, ResourceKind::Lead, None)?;
    self.stores.leads.delete_lead(id).await?;
    info!(lead_id = id, user_id = claims.user_id, "lead deleted");
    Ok(())
  }
}
