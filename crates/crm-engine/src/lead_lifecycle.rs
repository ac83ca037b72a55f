// Archivo: lead_lifecycle.rs
// Propósito: reglas de admisión de leads. El orden de los chequeos es parte
// del contrato observable: gana el primer fallo.
use crate::availability::PropertyAvailabilityIndex;
use crate::config::RoleConfig;
use crate::errors::{EngineError, Result, MSG_CONTACT_HAS_ACTIVE_LEAD, MSG_PROPERTY_COMMITTED};
use crm_domain::ids::{ContactId, PropertyId, UserId};
use crm_domain::{Claims, ContactStore, Lead, LeadStatus, LeadStore, PropertyStore, UserStore};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone)]
pub struct LeadLifecycleValidator {
  roles: RoleConfig,
  contacts: Arc<dyn ContactStore>,
  users: Arc<dyn UserStore>,
  properties: Arc<dyn PropertyStore>,
  leads: Arc<dyn LeadStore>,
  availability: PropertyAvailabilityIndex,
}

impl LeadLifecycleValidator {
  pub fn new(roles: RoleConfig,
             contacts: Arc<dyn ContactStore>,
             users: Arc<dyn UserStore>,
             properties: Arc<dyn PropertyStore>,
             leads: Arc<dyn LeadStore>,
             availability: PropertyAvailabilityIndex)
             -> Self {
    Self { roles, contacts, users, properties, leads, availability }
  }

  /// Valida un lead nuevo. El guard ya se ejecutó antes de llegar aquí.
  pub async fn validate_create(&self, lead: &Lead) -> Result<()> {
    Self::check_required(lead)?;
    self.check_contact(lead.contact_id).await?;
    self.check_assignee(lead.assigned_to).await?;

    let has_open = self.leads
                       .has_open_lead_for_contact(lead.contact_id)
                       .await
                       .inspect_err(|e| error!(contact_id = lead.contact_id, error = %e, "open-lead lookup failed"))?;
    if has_open {
      return Err(EngineError::business(MSG_CONTACT_HAS_ACTIVE_LEAD));
    }

    if let Some(property_id) = lead.referenced_property() {
      self.check_property(property_id).await?;
      let committed = self.availability
                          .is_committed(property_id)
                          .await
                          .inspect_err(|e| error!(property_id, error = %e, "availability lookup failed"))?;
      if committed {
        return Err(EngineError::business(MSG_PROPERTY_COMMITTED));
      }
    }
    Ok(())
  }

  /// Valida una actualización y devuelve el lead preparado para persistir.
  /// Sólo re-resuelve las claves foráneas que cambiaron; no vuelve a aplicar
  /// las reglas de admisión contra el propio lead. Una propiedad nueva debe
  /// estar libre.
  pub async fn validate_update(&self, existing: &Lead, incoming: &Lead, actor: &Claims) -> Result<Lead> {
    Self::check_required(incoming)?;
    if incoming.contact_id != existing.contact_id {
      self.check_contact(incoming.contact_id).await?;
    }
    if incoming.assigned_to != existing.assigned_to {
      self.check_assignee(incoming.assigned_to).await?;
    }
    let property_id = incoming.referenced_property();
    if property_id != existing.referenced_property() {
      if let Some(pid) = property_id {
        self.check_property(pid).await?;
        let committed = self.availability
                            .is_committed(pid)
                            .await
                            .inspect_err(|e| error!(property_id = pid, error = %e, "availability lookup failed"))?;
        if committed {
          return Err(EngineError::business(MSG_PROPERTY_COMMITTED));
        }
      }
    }
    debug!(lead_id = existing.id, user_id = actor.user_id, "lead update validated");
    Ok(Lead { id: existing.id, property_id, created_at: existing.created_at, ..incoming.clone() })
  }

  fn check_required(lead: &Lead) -> Result<()> {
    if lead.contact_id <= 0 || lead.source_id <= 0 || lead.status_id <= 0 || lead.assigned_to <= 0 {
      return Err(EngineError::validation("contact_id, source_id, status_id, and assigned_to are required fields"));
    }
    LeadStatus::from_id(lead.status_id).map_err(|_| EngineError::validation("invalid status_id"))?;
    Ok(())
  }

  async fn check_contact(&self, contact_id: ContactId) -> Result<()> {
    let contact = self.contacts
                      .get_contact(contact_id)
                      .await
                      .inspect_err(|e| error!(contact_id, error = %e, "contact lookup failed"))?;
    contact.map(|_| ()).ok_or_else(|| EngineError::validation("invalid contact_id"))
  }

  async fn check_assignee(&self, user_id: UserId) -> Result<()> {
    let user = self.users
                   .get_user(user_id)
                   .await
                   .inspect_err(|e| error!(user_id, error = %e, "assignee lookup failed"))?;
    match user {
      Some(u) if self.roles.role_of(u.role_id).is_some() => Ok(()),
      _ => Err(EngineError::validation("invalid assigned_to")),
    }
  }

  async fn check_property(&self, property_id: PropertyId) -> Result<()> {
    let property = self.properties
                       .get_property(property_id)
                       .await
                       .inspect_err(|e| error!(property_id, error = %e, "property lookup failed"))?;
    property.map(|_| ()).ok_or_else(|| EngineError::validation("invalid property_id"))
  }
}
