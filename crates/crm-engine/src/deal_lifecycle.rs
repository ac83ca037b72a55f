// Archivo: deal_lifecycle.rs
// Propósito: validar deals contra su lead de origen y derivar los efectos
// secundarios (propiedad vendida) que se aplican tras persistir.
use crate::errors::{EngineError, Result};
use crm_domain::ids::PropertyId;
use crm_domain::{Deal, DealStatus, LeadStore, PropertyStatus, PropertyStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Efecto secundario derivado de una escritura de deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
  MarkPropertySold { property_id: PropertyId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffectResult {
  Applied,
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectOutcome {
  pub effect: SideEffect,
  pub result: SideEffectResult,
}

/// Resultado de una escritura de deal: el deal persistido más el estado de
/// cada efecto secundario. Un efecto fallido no convierte la escritura en
/// error.
#[derive(Debug, Clone, PartialEq)]
pub struct DealWriteOutcome {
  pub deal: Deal,
  pub side_effects: Vec<SideEffectOutcome>,
}

impl DealWriteOutcome {
  pub fn is_degraded(&self) -> bool {
    self.side_effects.iter().any(|s| matches!(s.result, SideEffectResult::Failed(_)))
  }
}

#[derive(Clone)]
pub struct DealLifecycleValidator {
  leads: Arc<dyn LeadStore>,
  properties: Arc<dyn PropertyStore>,
}

impl DealLifecycleValidator {
  pub fn new(leads: Arc<dyn LeadStore>, properties: Arc<dyn PropertyStore>) -> Self {
    Self { leads, properties }
  }

  pub async fn validate_and_prepare_create(&self, deal: &Deal) -> Result<(Deal, Vec<SideEffect>)> {
    self.check_fields(deal).await?;
    let mut prepared = deal.clone();
    if prepared.deal_status.is_terminal() && prepared.closing_date.is_none() {
      prepared.closing_date = Some(Utc::now());
    }
    let effects = Self::effects_for(None, &prepared);
    Ok((prepared, effects))
  }

  /// `created_by` y `created_at` se conservan del deal existente. El efecto
  /// sólo se dispara al entrar en Closed-Won desde otro estado.
  pub async fn validate_and_prepare_update(&self, existing: &Deal, incoming: &Deal) -> Result<(Deal, Vec<SideEffect>)> {
    self.check_fields(incoming).await?;
    let mut prepared = Deal { id: existing.id,
                              created_by: existing.created_by,
                              created_at: existing.created_at,
                              ..incoming.clone() };
    if prepared.deal_status.is_terminal() && prepared.closing_date.is_none() {
      prepared.closing_date = existing.closing_date.or_else(|| Some(Utc::now()));
    }
    let effects = Self::effects_for(Some(existing.deal_status), &prepared);
    Ok((prepared, effects))
  }

  fn effects_for(previous: Option<DealStatus>, deal: &Deal) -> Vec<SideEffect> {
    if deal.deal_status == DealStatus::ClosedWon && previous != Some(DealStatus::ClosedWon) {
      vec![SideEffect::MarkPropertySold { property_id: deal.property_id }]
    } else {
      Vec::new()
    }
  }

  async fn check_fields(&self, deal: &Deal) -> Result<()> {
    let lead = self.leads
                   .get_lead(deal.lead_id)
                   .await
                   .inspect_err(|e| error!(lead_id = deal.lead_id, error = %e, "lead lookup failed"))?
                   .ok_or_else(|| EngineError::validation("invalid lead"))?;
    let lead_property = lead.referenced_property()
                            .ok_or_else(|| EngineError::business("lead has no property; cannot create deal"))?;
    if deal.property_id != lead_property {
      return Err(EngineError::Validation(format!("deal property ID ({}) does not match the original lead's property ID ({})",
                                                 deal.property_id, lead_property)));
    }
    if !(deal.deal_amount > 0.0) {
      return Err(EngineError::validation("deal amount must be positive"));
    }
    Ok(())
  }

  /// Aplica los efectos en modo best-effort: los fallos se registran y se
  /// devuelven, nunca se propagan.
  pub async fn apply_side_effects(&self, deal: &Deal, effects: Vec<SideEffect>) -> Vec<SideEffectOutcome> {
    let mut outcomes = Vec::with_capacity(effects.len());
    for effect in effects {
      let result = match effect {
        SideEffect::MarkPropertySold { property_id } => {
          match self.properties.set_property_status(property_id, PropertyStatus::Sold).await {
            Ok(()) => {
              info!(deal_id = deal.id, property_id, "property marked as sold");
              SideEffectResult::Applied
            }
            Err(e) => {
              warn!(deal_id = deal.id, property_id, error = %e, "failed to mark property as sold");
              SideEffectResult::Failed(e.to_string())
            }
          }
        }
      };
      outcomes.push(SideEffectOutcome { effect, result });
    }
    outcomes
  }
}
