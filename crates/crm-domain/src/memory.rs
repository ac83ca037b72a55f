// memory.rs
// Implementación en memoria de todos los stores. Orden fijo de bloqueo:
// contacts/properties/users -> leads -> deals -> tasks.
use crate::errors::{OPEN_LEAD_PER_CONTACT, PROPERTY_EXCLUSIVITY};
use crate::ids::{ContactId, DealId, LeadId, PropertyId, RoleId, SourceId, TaskId, UserId};
use crate::repository::{ContactStore, DealStore, LeadStore, PropertyStore, RoleDirectory, StoreResult, TaskStore, UserStore};
use crate::role::{RECEPTION_ROLE_NAME, SALES_AGENT_ROLE_NAME};
use crate::{Contact, Deal, DealStatus, Lead, LeadStatusCounts, PipelineStageRow, Property, PropertyStatus, SalesSummary, SourceLeadRow,
            SourceSalesRow, StoreError, Task, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Ids de rol sembrados por defecto, iguales a los de la migración SQL.
pub const SEED_SALES_AGENT_ROLE_ID: RoleId = 1;
pub const SEED_RECEPTION_ROLE_ID: RoleId = 2;

#[derive(Default)]
struct Sequences {
  users: AtomicI64,
  contacts: AtomicI64,
  properties: AtomicI64,
  leads: AtomicI64,
  deals: AtomicI64,
  tasks: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
  seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// Repositorio en memoria para tests y desarrollo.
pub struct InMemoryCrmRepository {
  roles: Arc<Mutex<HashMap<String, RoleId>>>,
  users: Arc<Mutex<BTreeMap<UserId, User>>>,
  contacts: Arc<Mutex<BTreeMap<ContactId, Contact>>>,
  properties: Arc<Mutex<BTreeMap<PropertyId, Property>>>,
  leads: Arc<Mutex<BTreeMap<LeadId, Lead>>>,
  deals: Arc<Mutex<BTreeMap<DealId, Deal>>>,
  tasks: Arc<Mutex<BTreeMap<TaskId, Task>>>,
  seq: Sequences,
}

impl InMemoryCrmRepository {
  /// Repositorio vacío con los dos roles sembrados.
  pub fn new() -> Self {
    let mut roles = HashMap::new();
    roles.insert(SALES_AGENT_ROLE_NAME.to_string(), SEED_SALES_AGENT_ROLE_ID);
    roles.insert(RECEPTION_ROLE_NAME.to_string(), SEED_RECEPTION_ROLE_ID);
    Self { roles: Arc::new(Mutex::new(roles)),
           users: Arc::new(Mutex::new(BTreeMap::new())),
           contacts: Arc::new(Mutex::new(BTreeMap::new())),
           properties: Arc::new(Mutex::new(BTreeMap::new())),
           leads: Arc::new(Mutex::new(BTreeMap::new())),
           deals: Arc::new(Mutex::new(BTreeMap::new())),
           tasks: Arc::new(Mutex::new(BTreeMap::new())),
           seq: Sequences::default() }
  }

  // Mutex envenenado -> StoreError::Unavailable
  fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> StoreResult<MutexGuard<'a, T>> {
    m.lock().map_err(|e| StoreError::Unavailable(format!("Mutex '{}' poisoned: {}", name, e)))
  }

  /// Registra (o reemplaza) un rol. Útil para bootstraps con ids propios.
  pub fn insert_role(&self, name: &str, id: RoleId) -> StoreResult<()> {
    let mut roles = self.lock_map(&self.roles, "roles")?;
    roles.insert(name.to_string(), id);
    Ok(())
  }

  /// Quita un rol del directorio; sirve para probar arranques sin roles.
  pub fn remove_role(&self, name: &str) -> StoreResult<()> {
    let mut roles = self.lock_map(&self.roles, "roles")?;
    roles.remove(name);
    Ok(())
  }
}

impl Default for InMemoryCrmRepository {
  fn default() -> Self {
    Self::new()
  }
}

fn open_lead_for_contact(leads: &BTreeMap<LeadId, Lead>, contact_id: ContactId, except: LeadId) -> bool {
  leads.values().any(|l| l.id != except && l.contact_id == contact_id && l.is_open())
}

fn open_lead_for_property(leads: &BTreeMap<LeadId, Lead>, property_id: PropertyId, except: LeadId) -> bool {
  leads.values().any(|l| l.id != except && l.property_id == Some(property_id) && l.is_open())
}

fn open_deal_for_property(deals: &BTreeMap<DealId, Deal>, property_id: PropertyId) -> bool {
  deals.values().any(|d| d.property_id == property_id && d.is_open())
}

#[async_trait]
impl RoleDirectory for InMemoryCrmRepository {
  async fn role_id_by_name(&self, name: &str) -> StoreResult<Option<RoleId>> {
    let roles = self.lock_map(&self.roles, "roles")?;
    Ok(roles.get(name).copied())
  }
}

#[async_trait]
impl UserStore for InMemoryCrmRepository {
  async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
    let users = self.lock_map(&self.users, "users")?;
    Ok(users.get(&id).cloned())
  }

  async fn list_users(&self) -> StoreResult<Vec<User>> {
    let users = self.lock_map(&self.users, "users")?;
    let mut out: Vec<User> = users.values().cloned().collect();
    out.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(out)
  }

  async fn list_users_by_role(&self, role_id: RoleId) -> StoreResult<Vec<User>> {
    let users = self.lock_map(&self.users, "users")?;
    let mut out: Vec<User> = users.values().filter(|u| u.role_id == role_id).cloned().collect();
    out.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(out)
  }

  async fn create_user(&self, mut user: User) -> StoreResult<User> {
    let mut users = self.lock_map(&self.users, "users")?;
    user.id = next(&self.seq.users);
    users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn update_user(&self, user: User) -> StoreResult<User> {
    let mut users = self.lock_map(&self.users, "users")?;
    let slot = users.get_mut(&user.id).ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
    let created_at = slot.created_at;
    *slot = User { created_at, ..user };
    Ok(slot.clone())
  }

  async fn delete_user(&self, id: UserId) -> StoreResult<()> {
    let mut users = self.lock_map(&self.users, "users")?;
    let leads = self.lock_map(&self.leads, "leads")?;
    let tasks = self.lock_map(&self.tasks, "tasks")?;
    if leads.values().any(|l| l.assigned_to == id) || tasks.values().any(|t| t.assigned_to == id) {
      return Err(StoreError::Referenced(format!("user {} has assigned leads or tasks", id)));
    }
    users.remove(&id).map(|_| ()).ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
  }
}

#[async_trait]
impl ContactStore for InMemoryCrmRepository {
  async fn get_contact(&self, id: ContactId) -> StoreResult<Option<Contact>> {
    let contacts = self.lock_map(&self.contacts, "contacts")?;
    Ok(contacts.get(&id).cloned())
  }

  async fn list_contacts(&self) -> StoreResult<Vec<Contact>> {
    let contacts = self.lock_map(&self.contacts, "contacts")?;
    Ok(contacts.values().cloned().collect())
  }

  async fn list_contacts_for_agent(&self, user_id: UserId) -> StoreResult<Vec<Contact>> {
    let contacts = self.lock_map(&self.contacts, "contacts")?;
    let leads = self.lock_map(&self.leads, "leads")?;
    Ok(contacts.values()
               .filter(|c| leads.values().any(|l| l.contact_id == c.id && l.assigned_to == user_id))
               .cloned()
               .collect())
  }

  async fn create_contact(&self, mut contact: Contact) -> StoreResult<Contact> {
    let mut contacts = self.lock_map(&self.contacts, "contacts")?;
    contact.id = next(&self.seq.contacts);
    contacts.insert(contact.id, contact.clone());
    Ok(contact)
  }

  async fn update_contact(&self, contact: Contact) -> StoreResult<Contact> {
    let mut contacts = self.lock_map(&self.contacts, "contacts")?;
    let slot = contacts.get_mut(&contact.id).ok_or_else(|| StoreError::NotFound(format!("contact {}", contact.id)))?;
    let created_at = slot.created_at;
    let created_by = slot.created_by;
    *slot = Contact { created_at, created_by, ..contact };
    Ok(slot.clone())
  }

  async fn delete_contact(&self, id: ContactId) -> StoreResult<()> {
    let mut contacts = self.lock_map(&self.contacts, "contacts")?;
    let leads = self.lock_map(&self.leads, "leads")?;
    if leads.values().any(|l| l.contact_id == id) {
      return Err(StoreError::Referenced(format!("contact {} is referenced by a lead", id)));
    }
    contacts.remove(&id).map(|_| ()).ok_or_else(|| StoreError::NotFound(format!("contact {}", id)))
  }
}

#[async_trait]
impl PropertyStore for InMemoryCrmRepository {
  async fn get_property(&self, id: PropertyId) -> StoreResult<Option<Property>> {
    let properties = self.lock_map(&self.properties, "properties")?;
    Ok(properties.get(&id).cloned())
  }

  async fn list_properties(&self) -> StoreResult<Vec<Property>> {
    let properties = self.lock_map(&self.properties, "properties")?;
    Ok(properties.values().cloned().collect())
  }

  async fn create_property(&self, mut property: Property) -> StoreResult<Property> {
    let mut properties = self.lock_map(&self.properties, "properties")?;
    property.id = next(&self.seq.properties);
    properties.insert(property.id, property.clone());
    Ok(property)
  }

  async fn update_property(&self, property: Property) -> StoreResult<Property> {
    let mut properties = self.lock_map(&self.properties, "properties")?;
    let slot = properties.get_mut(&property.id)
                         .ok_or_else(|| StoreError::NotFound(format!("property {}", property.id)))?;
    let created_at = slot.created_at;
    *slot = Property { created_at, updated_at: Utc::now(), ..property };
    Ok(slot.clone())
  }

  async fn set_property_status(&self, id: PropertyId, status: PropertyStatus) -> StoreResult<()> {
    let mut properties = self.lock_map(&self.properties, "properties")?;
    let slot = properties.get_mut(&id).ok_or_else(|| StoreError::NotFound(format!("property {}", id)))?;
    slot.status = status;
    slot.updated_at = Utc::now();
    Ok(())
  }

  async fn delete_property(&self, id: PropertyId) -> StoreResult<()> {
    let mut properties = self.lock_map(&self.properties, "properties")?;
    let leads = self.lock_map(&self.leads, "leads")?;
    let deals = self.lock_map(&self.deals, "deals")?;
    if leads.values().any(|l| l.property_id == Some(id)) || deals.values().any(|d| d.property_id == id) {
      return Err(StoreError::Referenced(format!("property {} is referenced by a lead or deal", id)));
    }
    properties.remove(&id).map(|_| ()).ok_or_else(|| StoreError::NotFound(format!("property {}", id)))
  }
}

#[async_trait]
impl LeadStore for InMemoryCrmRepository {
  async fn get_lead(&self, id: LeadId) -> StoreResult<Option<Lead>> {
    let leads = self.lock_map(&self.leads, "leads")?;
    Ok(leads.get(&id).cloned())
  }

  async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
    let leads = self.lock_map(&self.leads, "leads")?;
    Ok(leads.values().cloned().collect())
  }

  async fn list_leads_for_user(&self, user_id: UserId) -> StoreResult<Vec<Lead>> {
    let leads = self.lock_map(&self.leads, "leads")?;
    Ok(leads.values().filter(|l| l.assigned_to == user_id).cloned().collect())
  }

  async fn create_lead(&self, mut lead: Lead) -> StoreResult<Lead> {
    let mut leads = self.lock_map(&self.leads, "leads")?;
    let deals = self.lock_map(&self.deals, "deals")?;
    if lead.is_open() && open_lead_for_contact(&leads, lead.contact_id, 0) {
      return Err(StoreError::UniqueViolation(OPEN_LEAD_PER_CONTACT));
    }
    if let Some(pid) = lead.referenced_property() {
      if open_lead_for_property(&leads, pid, 0) || open_deal_for_property(&deals, pid) {
        return Err(StoreError::UniqueViolation(PROPERTY_EXCLUSIVITY));
      }
    }
    lead.property_id = lead.referenced_property();
    lead.id = next(&self.seq.leads);
    leads.insert(lead.id, lead.clone());
    Ok(lead)
  }

  async fn update_lead(&self, mut lead: Lead) -> StoreResult<Lead> {
    let mut leads = self.lock_map(&self.leads, "leads")?;
    let created_at = leads.get(&lead.id)
                          .map(|l| l.created_at)
                          .ok_or_else(|| StoreError::NotFound(format!("lead {}", lead.id)))?;
    lead.property_id = lead.referenced_property();
    if lead.is_open() {
      if open_lead_for_contact(&leads, lead.contact_id, lead.id) {
        return Err(StoreError::UniqueViolation(OPEN_LEAD_PER_CONTACT));
      }
      if let Some(pid) = lead.property_id {
        if open_lead_for_property(&leads, pid, lead.id) {
          return Err(StoreError::UniqueViolation(PROPERTY_EXCLUSIVITY));
        }
      }
    }
    lead.created_at = created_at;
    lead.updated_at = Utc::now();
    leads.insert(lead.id, lead.clone());
    Ok(lead)
  }

  async fn delete_lead(&self, id: LeadId) -> StoreResult<()> {
    let mut leads = self.lock_map(&self.leads, "leads")?;
    let deals = self.lock_map(&self.deals, "deals")?;
    if deals.values().any(|d| d.lead_id == id) {
      return Err(StoreError::Referenced(format!("lead {} is referenced by a deal", id)));
    }
    leads.remove(&id).map(|_| ()).ok_or_else(|| StoreError::NotFound(format!("lead {}", id)))
  }

  async fn has_open_lead_for_contact(&self, contact_id: ContactId) -> StoreResult<bool> {
    let leads = self.lock_map(&self.leads, "leads")?;
    Ok(open_lead_for_contact(&leads, contact_id, 0))
  }

  async fn has_open_lead_for_property(&self, property_id: PropertyId) -> StoreResult<bool> {
    let leads = self.lock_map(&self.leads, "leads")?;
    Ok(open_lead_for_property(&leads, property_id, 0))
  }

  async fn count_leads_by_status_for_user(&self, user_id: UserId) -> StoreResult<LeadStatusCounts> {
    let leads = self.lock_map(&self.leads, "leads")?;
    let mut counts = LeadStatusCounts::default();
    for status in leads.values().filter(|l| l.assigned_to == user_id).filter_map(|l| l.status().ok()) {
      counts.record(status);
    }
    Ok(counts)
  }

  async fn source_lead_rows(&self) -> StoreResult<Vec<SourceLeadRow>> {
    let contacts = self.lock_map(&self.contacts, "contacts")?;
    let users = self.lock_map(&self.users, "users")?;
    let leads = self.lock_map(&self.leads, "leads")?;
    let mut rows: Vec<SourceLeadRow> = leads.values()
                                            .filter_map(|l| {
                                              let contact = contacts.get(&l.contact_id)?;
                                              let user = users.get(&l.assigned_to)?;
                                              let status = l.status().ok()?;
                                              Some(SourceLeadRow { lead_id: l.id,
                                                                   lead_date: l.created_at,
                                                                   contact_name: contact.full_name(),
                                                                   contact_phone: contact.primary_phone.clone(),
                                                                   contact_email: contact.email.clone(),
                                                                   source_id: l.source_id,
                                                                   assigned_employee: user.username.clone(),
                                                                   lead_status: status.to_string() })
                                            })
                                            .collect();
    rows.sort_by(|a, b| b.lead_date.cmp(&a.lead_date).then(b.lead_id.cmp(&a.lead_id)));
    Ok(rows)
  }
}

#[async_trait]
impl DealStore for InMemoryCrmRepository {
  async fn get_deal(&self, id: DealId) -> StoreResult<Option<Deal>> {
    let deals = self.lock_map(&self.deals, "deals")?;
    Ok(deals.get(&id).cloned())
  }

  async fn list_deals(&self) -> StoreResult<Vec<Deal>> {
    let deals = self.lock_map(&self.deals, "deals")?;
    Ok(deals.values().cloned().collect())
  }

  async fn list_deals_for_user(&self, user_id: UserId) -> StoreResult<Vec<Deal>> {
    let deals = self.lock_map(&self.deals, "deals")?;
    Ok(deals.values().filter(|d| d.created_by == Some(user_id)).cloned().collect())
  }

  async fn create_deal(&self, mut deal: Deal) -> StoreResult<Deal> {
    let mut deals = self.lock_map(&self.deals, "deals")?;
    deal.id = next(&self.seq.deals);
    deals.insert(deal.id, deal.clone());
    Ok(deal)
  }

  async fn update_deal(&self, deal: Deal) -> StoreResult<Deal> {
    let mut deals = self.lock_map(&self.deals, "deals")?;
    let slot = deals.get_mut(&deal.id).ok_or_else(|| StoreError::NotFound(format!("deal {}", deal.id)))?;
    let created_at = slot.created_at;
    *slot = Deal { created_at, updated_at: Utc::now(), ..deal };
    Ok(slot.clone())
  }

  async fn delete_deal(&self, id: DealId) -> StoreResult<()> {
    let mut deals = self.lock_map(&self.deals, "deals")?;
    deals.remove(&id).map(|_| ()).ok_or_else(|| StoreError::NotFound(format!("deal {}", id)))
  }

  async fn has_open_deal_for_property(&self, property_id: PropertyId) -> StoreResult<bool> {
    let deals = self.lock_map(&self.deals, "deals")?;
    Ok(open_deal_for_property(&deals, property_id))
  }

  async fn sales_summary_for_user(&self, user_id: UserId) -> StoreResult<SalesSummary> {
    let leads = self.lock_map(&self.leads, "leads")?;
    let deals = self.lock_map(&self.deals, "deals")?;
    let mut summary = SalesSummary::default();
    for deal in deals.values().filter(|d| d.deal_status == DealStatus::ClosedWon) {
      if leads.get(&deal.lead_id).is_some_and(|l| l.assigned_to == user_id) {
        summary.record(deal.deal_amount);
      }
    }
    Ok(summary)
  }

  async fn sales_by_source(&self) -> StoreResult<Vec<SourceSalesRow>> {
    let leads = self.lock_map(&self.leads, "leads")?;
    let deals = self.lock_map(&self.deals, "deals")?;
    let mut by_source: BTreeMap<SourceId, SalesSummary> = BTreeMap::new();
    for deal in deals.values().filter(|d| d.deal_status == DealStatus::ClosedWon) {
      if let Some(lead) = leads.get(&deal.lead_id) {
        by_source.entry(lead.source_id).or_default().record(deal.deal_amount);
      }
    }
    let mut rows: Vec<SourceSalesRow> =
      by_source.into_iter().map(|(source_id, sales)| SourceSalesRow { source_id, sales }).collect();
    rows.sort_by(|a, b| {
          b.sales
           .total_sales_amount
           .total_cmp(&a.sales.total_sales_amount)
           .then(a.source_id.cmp(&b.source_id))
        });
    Ok(rows)
  }

  async fn deal_pipeline(&self, created_by: Option<UserId>) -> StoreResult<Vec<PipelineStageRow>> {
    let deals = self.lock_map(&self.deals, "deals")?;
    let mut rows: Vec<PipelineStageRow> = DealStatus::ALL.into_iter().map(PipelineStageRow::empty).collect();
    for deal in deals.values().filter(|d| created_by.is_none() || d.created_by == created_by) {
      if let Some(row) = rows.iter_mut().find(|r| r.stage == deal.deal_status) {
        row.record(deal.deal_amount);
      }
    }
    Ok(rows)
  }
}

#[async_trait]
impl TaskStore for InMemoryCrmRepository {
  async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
    let tasks = self.lock_map(&self.tasks, "tasks")?;
    Ok(tasks.get(&id).cloned())
  }

  async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
    let tasks = self.lock_map(&self.tasks, "tasks")?;
    Ok(tasks.values().cloned().collect())
  }

  async fn list_tasks_for_user(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
    let tasks = self.lock_map(&self.tasks, "tasks")?;
    Ok(tasks.values().filter(|t| t.assigned_to == user_id).cloned().collect())
  }

  async fn create_task(&self, mut task: Task) -> StoreResult<Task> {
    let mut tasks = self.lock_map(&self.tasks, "tasks")?;
    task.id = next(&self.seq.tasks);
    tasks.insert(task.id, task.clone());
    Ok(task)
  }

  async fn update_task(&self, task: Task) -> StoreResult<Task> {
    let mut tasks = self.lock_map(&self.tasks, "tasks")?;
    let slot = tasks.get_mut(&task.id).ok_or_else(|| StoreError::NotFound(format!("task {}", task.id)))?;
    let created_at = slot.created_at;
    *slot = Task { created_at, updated_at: Utc::now(), ..task };
    Ok(slot.clone())
  }

  async fn delete_task(&self, id: TaskId) -> StoreResult<()> {
    let mut tasks = self.lock_map(&self.tasks, "tasks")?;
    tasks.remove(&id).map(|_| ()).ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::LeadStatus;

  #[tokio::test]
  async fn second_open_lead_for_contact_is_refused() -> Result<(), StoreError> {
    let repo = InMemoryCrmRepository::new();
    let first = repo.create_lead(Lead::new(1, 2, LeadStatus::New, 5)).await?;
    assert_eq!(first.id, 1);
    let err = repo.create_lead(Lead::new(1, 2, LeadStatus::Qualified, 5)).await.unwrap_err();
    assert_eq!(err, StoreError::UniqueViolation(OPEN_LEAD_PER_CONTACT));
    // Un lead cerrado no compite por la unicidad.
    repo.create_lead(Lead::new(1, 2, LeadStatus::Lost, 5)).await?;
    Ok(())
  }

  #[tokio::test]
  async fn property_held_by_open_deal_is_exclusive() -> Result<(), StoreError> {
    let repo = InMemoryCrmRepository::new();
    repo.create_deal(Deal::new(10, 42, 1, 1000.0)).await?;
    let err = repo.create_lead(Lead::new(3, 2, LeadStatus::New, 5).with_property(42)).await.unwrap_err();
    assert_eq!(err, StoreError::UniqueViolation(PROPERTY_EXCLUSIVITY));
    Ok(())
  }

  #[tokio::test]
  async fn reopening_a_lead_keeps_one_open_per_contact() -> Result<(), StoreError> {
    let repo = InMemoryCrmRepository::new();
    let lost = repo.create_lead(Lead::new(1, 2, LeadStatus::Lost, 5)).await?;
    repo.create_lead(Lead::new(1, 2, LeadStatus::New, 5)).await?;
    let reopened = Lead { status_id: LeadStatus::Contacted.id(), ..lost };
    assert_eq!(repo.update_lead(reopened).await, Err(StoreError::UniqueViolation(OPEN_LEAD_PER_CONTACT)));
    Ok(())
  }

  #[tokio::test]
  async fn referenced_rows_cannot_be_deleted() -> Result<(), StoreError> {
    let repo = InMemoryCrmRepository::new();
    let contact = repo.create_contact(Contact::new("Ana", "Pérez", "0911")).await?;
    let property = repo.create_property(Property::new("Torre A - 3B", 1, 1, 100.0)).await?;
    let lead = repo.create_lead(Lead::new(contact.id, 2, LeadStatus::New, 5).with_property(property.id)).await?;
    repo.create_deal(Deal::new(lead.id, property.id, 1, 100.0)).await?;

    assert!(matches!(repo.delete_contact(contact.id).await, Err(StoreError::Referenced(_))));
    assert!(matches!(repo.delete_property(property.id).await, Err(StoreError::Referenced(_))));
    assert!(matches!(repo.delete_lead(lead.id).await, Err(StoreError::Referenced(_))));
    assert!(matches!(repo.delete_deal(99).await, Err(StoreError::NotFound(_))));
    Ok(())
  }

  #[tokio::test]
  async fn sales_summary_counts_closed_won_by_lead_assignee() -> Result<(), StoreError> {
    let repo = InMemoryCrmRepository::new();
    let lead = repo.create_lead(Lead::new(1, 2, LeadStatus::Converted, 5).with_property(7)).await?;
    repo.create_deal(Deal::new(lead.id, 7, 1, 250.0).with_status(DealStatus::ClosedWon)).await?;
    repo.create_deal(Deal::new(lead.id, 7, 1, 900.0).with_status(DealStatus::ClosedLost)).await?;
    let s = repo.sales_summary_for_user(5).await?;
    assert_eq!(s.number_of_sales, 1);
    assert_eq!(s.total_sales_amount, 250.0);
    assert_eq!(repo.sales_summary_for_user(6).await?, SalesSummary::default());
    Ok(())
  }

  #[tokio::test]
  async fn sales_and_pipeline_group_closed_deals() -> Result<(), StoreError> {
    let repo = InMemoryCrmRepository::new();
    let web = repo.create_lead(Lead::new(1, 1, LeadStatus::Converted, 5).with_property(7)).await?;
    let referral = repo.create_lead(Lead::new(2, 3, LeadStatus::Converted, 5).with_property(8)).await?;
    repo.create_deal(Deal::new(web.id, 7, 1, 100.0).with_status(DealStatus::ClosedWon)).await?;
    repo.create_deal(Deal::new(referral.id, 8, 1, 400.0).with_status(DealStatus::ClosedWon)).await?;
    let mut open = Deal::new(web.id, 7, 1, 30.0);
    open.created_by = Some(5);
    repo.create_deal(open).await?;

    let by_source: Vec<(i64, u64)> =
      repo.sales_by_source().await?.into_iter().map(|r| (r.source_id, r.sales.number_of_sales)).collect();
    assert_eq!(by_source, vec![(3, 1), (1, 1)]);

    let pipeline = repo.deal_pipeline(None).await?;
    assert_eq!(pipeline.iter().map(|r| r.deal_count).collect::<Vec<_>>(), vec![1, 2, 0]);
    assert_eq!(pipeline[1].total_amount, 500.0);
    let mine = repo.deal_pipeline(Some(5)).await?;
    assert_eq!(mine.iter().map(|r| r.deal_count).collect::<Vec<_>>(), vec![1, 0, 0]);
    Ok(())
  }

  #[tokio::test]
  async fn poisoned_mutex_surfaces_as_unavailable() {
    let repo = InMemoryCrmRepository::new();
    let leads = repo.leads.clone();
    let _ = std::thread::spawn(move || {
              let _guard = leads.lock().unwrap();
              panic!("poison");
            }).join();
    assert!(matches!(repo.list_leads().await, Err(StoreError::Unavailable(_))));
  }
}
