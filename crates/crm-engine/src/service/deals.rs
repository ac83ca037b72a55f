// Archivo: service/deals.rs
use super::{not_found, owner_or_nobody, CrmService};
use crate::deal_lifecycle::DealWriteOutcome;
use crate::errors::Result;
use crate::guard::{Action, ResourceKind};
use crm_domain::ids::DealId;
use crm_domain::{Claims, Deal};
use tracing::info;

impl CrmService {
  /// Persiste el deal y luego aplica sus efectos en modo best-effort.
  pub async fn create_deal(&self, claims: &Claims, deal: Deal) -> Result<DealWriteOutcome> {
    self.guard.require(claims, Action::Create, ResourceKind::Deal, None)?;
    let (mut prepared, effects) = self.deal_validator.validate_and_prepare_create(&deal).await?;
    prepared.id = 0;
    prepared.created_by = Some(claims.user_id);
    let created = self.stores.deals.create_deal(prepared).await?;
    info!(deal_id = created.id,
          lead_id = created.lead_id,
          property_id = created.property_id,
          status = %created.deal_status,
          "deal created");
    let side_effects = self.deal_validator.apply_side_effects(&created, effects).await;
    Ok(DealWriteOutcome { deal: created, side_effects })
  }

  pub async fn get_deal(&self, claims: &Claims, id: DealId) -> Result<Deal> {
    let deal = self.stores.deals.get_deal(id).await?.ok_or_else(|| not_found("deal", id))?;
    self.guard.require(claims, Action::Read, ResourceKind::Deal, owner_or_nobody(deal.created_by))?;
    Ok(deal)
  }

  /// Un agente lista sólo los deals que creó.
  pub async fn list_deals(&self, claims: &Claims) -> Result<Vec<Deal>> {
    self.guard.require(claims, Action::Read, ResourceKind::Deal, None)?;
    if self.is_reception(claims) {
      Ok(self.stores.deals.list_deals().await?)
    } else {
      Ok(self.stores.deals.list_deals_for_user(claims.user_id).await?)
    }
  }

  pub async fn update_deal(&self, claims: &Claims, id: DealId, incoming: Deal) -> Result<DealWriteOutcome> {
    let existing = self.stores.deals.get_deal(id).await?.ok_or_else(|| not_found("deal", id))?;
    self.guard.require(claims, Action::Update, ResourceKind::Deal, owner_or_nobody(existing.created_by))?;
    let (prepared, effects) = self.deal_validator.validate_and_prepare_update(&existing, &incoming).await?;
    let updated = self.stores.deals.update_deal(prepared).await?;
    info!(deal_id = updated.id, status = %updated.deal_status, user_id = claims.user_id, "deal updated");
    let side_effects = self.deal_validator.apply_side_effects(&updated, effects).await;
    Ok(DealWriteOutcome { deal: updated, side_effects })
  }

  pub async fn delete_deal(&self, claims: &Claims, id: DealId) -> Result<()> {
    self.guard.require(claims, Action::Delete, ResourceKind::Deal, None)?;
    self.stores.deals.delete_deal(id).await?;
    info!(deal_id = id, user_id = claims.user_id, "deal deleted");
    Ok(())
  }
}
