// Archivo: service/contacts.rs
use super::{not_found, owner_or_nobody, CrmService};
use crate::errors::Result;
use crate::guard::{Action, ResourceKind};
use crm_domain::ids::{ContactId, UserId};
use crm_domain::{Claims, Contact};
use tracing::info;

impl CrmService {
  pub async fn create_contact(&self, claims: &Claims, mut contact: Contact) -> Result<Contact> {
    self.guard.require(claims, Action::Create, ResourceKind::Contact, None)?;
    contact.validate()?;
    contact.id = 0;
    contact.created_by = Some(claims.user_id);
    let created = self.stores.contacts.create_contact(contact).await?;
    info!(contact_id = created.id, user_id = claims.user_id, "contact created");
    Ok(created)
  }

  /// Un agente ve los contactos de sus leads y los que no tienen dueño (sin
  /// leads ni creador).
  pub async fn get_contact(&self, claims: &Claims, id: ContactId) -> Result<Contact> {
    let contact = self.stores.contacts.get_contact(id).await?.ok_or_else(|| not_found("contact", id))?;
    let owner = if self.is_reception(claims) {
      contact.created_by
    } else {
      self.contact_owner_for_agent(claims, &contact).await?
    };
    self.guard.require(claims, Action::Read, ResourceKind::Contact, owner)?;
    Ok(contact)
  }

  pub async fn list_contacts(&self, claims: &Claims) -> Result<Vec<Contact>> {
    self.guard.require(claims, Action::Read, ResourceKind::Contact, None)?;
    if self.is_reception(claims) {
      Ok(self.stores.contacts.list_contacts().await?)
    } else {
      Ok(self.stores.contacts.list_contacts_for_agent(claims.user_id).await?)
    }
  }

  pub async fn update_contact(&self, claims: &Claims, contact: Contact) -> Result<Contact> {
    let existing = self.stores
                       .contacts
                       .get_contact(contact.id)
                       .await?
                       .ok_or_else(|| not_found("contact", contact.id))?;
    self.guard.require(claims, Action::Update, ResourceKind::Contact, owner_or_nobody(existing.created_by))?;
    contact.validate()?;
    let updated = self.stores.contacts.update_contact(contact).await?;
    info!(contact_id = updated.id, user_id = claims.user_id, "contact updated");
    Ok(updated)
  }

  pub async fn delete_contact(&self, claims: &Claims, id: ContactId) -> Result<()> {
    self.guard.require(claims, Action::Delete, ResourceKind::Contact, None)?;
    self.stores.contacts.delete_contact(id).await?;
    info!(contact_id = id, user_id = claims.user_id, "contact deleted");
    Ok(())
  }

  // Dueño: el agente si uno de sus leads apunta al contacto, si no el asignado
  // de otro lead del contacto, si no el creador.
  async fn contact_owner_for_agent(&self, claims: &Claims, contact: &Contact) -> Result<Option<UserId>> {
    let leads = self.stores.leads.list_leads().await?;
    let assignees: Vec<UserId> = leads.iter().filter(|l| l.contact_id == contact.id).map(|l| l.assigned_to).collect();
    if assignees.contains(&claims.user_id) {
      return Ok(Some(claims.user_id));
    }
    Ok(assignees.first().copied().or(contact.created_by))
  }
}
