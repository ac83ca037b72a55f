// Archivo: availability.rs
use crate::errors::Result;
use crm_domain::ids::PropertyId;
use crm_domain::{DealStore, LeadStore};
use std::sync::Arc;

/// Responde si una propiedad está comprometida: referenciada por un lead
/// abierto o por un deal no terminal. Sólo consultas de existencia.
#[derive(Clone)]
pub struct PropertyAvailabilityIndex {
  leads: Arc<dyn LeadStore>,
  deals: Arc<dyn DealStore>,
}

impl PropertyAvailabilityIndex {
  pub fn new(leads: Arc<dyn LeadStore>, deals: Arc<dyn DealStore>) -> Self {
    Self { leads, deals }
  }

  /// Los errores del store se propagan sin transformar su tipo.
  pub async fn is_committed(&self, property_id: PropertyId) -> Result<bool> {
    if self.leads.has_open_lead_for_property(property_id).await? {
      return Ok(true);
    }
    Ok(self.deals.has_open_deal_for_property(property_id).await?)
  }
}
