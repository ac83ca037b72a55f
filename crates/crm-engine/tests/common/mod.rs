// Utilidades compartidas por los tests de integración del motor.
#![allow(dead_code)]

use async_trait::async_trait;
use crm_domain::ids::{ContactId, LeadId, PropertyId, UserId};
use crm_domain::{Claims, Contact, ContactStore, InMemoryCrmRepository, Lead, LeadStatusCounts, LeadStore, Property, PropertyStatus,
                 PropertyStore, SourceLeadRow, StoreError, StoreResult, User, UserStore, SEED_RECEPTION_ROLE_ID,
                 SEED_SALES_AGENT_ROLE_ID};
use crm_engine::{CrmService, RoleConfig, Stores};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const RECEPTION: i64 = SEED_RECEPTION_ROLE_ID;
pub const AGENT: i64 = SEED_SALES_AGENT_ROLE_ID;

pub fn roles() -> RoleConfig {
  RoleConfig::new(RECEPTION, AGENT)
}

pub fn reception() -> Claims {
  Claims::new(1, RECEPTION)
}

pub fn agent(user_id: UserId) -> Claims {
  Claims::new(user_id, AGENT)
}

/// Usuarios: 1 recepción; 2..=5 agentes (agent_ana, agent_bruno,
/// agent_carla, agent_diego). Contactos 1..=3. Propiedades 1..=3.
pub async fn seeded_repo() -> Arc<InMemoryCrmRepository> {
  let repo = Arc::new(InMemoryCrmRepository::new());
  repo.create_user(User::new("recepcion", "r@crm.test", RECEPTION)).await.unwrap();
  for name in ["agent_ana", "agent_bruno", "agent_carla", "agent_diego"] {
    repo.create_user(User::new(name, format!("{name}@crm.test"), AGENT)).await.unwrap();
  }
  for (first, phone) in [("Lucía", "0991"), ("Mateo", "0992"), ("Sofía", "0993")] {
    repo.create_contact(Contact::new(first, "Test", phone)).await.unwrap();
  }
  for name in ["Torre A - 1", "Torre A - 2", "Torre B - 1"] {
    repo.create_property(Property::new(name, 1, 1, 100_000.0)).await.unwrap();
  }
  repo
}

pub fn service_over(stores: Stores) -> CrmService {
  CrmService::new(stores, roles())
}

pub async fn seeded_service() -> (Arc<InMemoryCrmRepository>, CrmService) {
  let repo = seeded_repo().await;
  let service = service_over(Stores::from_repository(repo.clone()));
  (repo, service)
}

/// LeadStore que falla el conteo por estado para ciertos usuarios y puede
/// demorar cada conteo.
pub struct FaultyLeads {
  pub inner: Arc<InMemoryCrmRepository>,
  pub fail_for: Vec<UserId>,
  pub delay: Option<Duration>,
}

#[async_trait]
impl LeadStore for FaultyLeads {
  async fn get_lead(&self, id: LeadId) -> StoreResult<Option<Lead>> {
    self.inner.get_lead(id).await
  }
  async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
    self.inner.list_leads().await
  }
  async fn list_leads_for_user(&self, user_id: UserId) -> StoreResult<Vec<Lead>> {
    self.inner.list_leads_for_user(user_id).await
  }
  async fn create_lead(&self, lead: Lead) -> StoreResult<Lead> {
    self.inner.create_lead(lead).await
  }
  async fn update_lead(&self, lead: Lead) -> StoreResult<Lead> {
    self.inner.update_lead(lead).await
  }
  async fn delete_lead(&self, id: LeadId) -> StoreResult<()> {
    self.inner.delete_lead(id).await
  }
  async fn has_open_lead_for_contact(&self, contact_id: ContactId) -> StoreResult<bool> {
    self.inner.has_open_lead_for_contact(contact_id).await
  }
  async fn has_open_lead_for_property(&self, property_id: PropertyId) -> StoreResult<bool> {
    self.inner.has_open_lead_for_property(property_id).await
  }
  async fn count_leads_by_status_for_user(&self, user_id: UserId) -> StoreResult<LeadStatusCounts> {
    if let Some(d) = self.delay {
      tokio::time::sleep(d).await;
    }
    if self.fail_for.contains(&user_id) {
      return Err(StoreError::Unavailable(format!("count failed for {user_id}")));
    }
    self.inner.count_leads_by_status_for_user(user_id).await
  }
  async fn source_lead_rows(&self) -> StoreResult<Vec<SourceLeadRow>> {
    self.inner.source_lead_rows().await
  }
}

/// PropertyStore que cuenta (y opcionalmente hace fallar) `set_property_status`.
pub struct CountingProperties {
  pub inner: Arc<InMemoryCrmRepository>,
  pub status_calls: AtomicUsize,
  pub fail_status: bool,
}

impl CountingProperties {
  pub fn new(inner: Arc<InMemoryCrmRepository>, fail_status: bool) -> Self {
    Self { inner, status_calls: AtomicUsize::new(0), fail_status }
  }

  pub fn calls(&self) -> usize {
    self.status_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PropertyStore for CountingProperties {
  async fn get_property(&self, id: PropertyId) -> StoreResult<Option<Property>> {
    self.inner.get_property(id).await
  }
  async fn list_properties(&self) -> StoreResult<Vec<Property>> {
    self.inner.list_properties().await
  }
  async fn create_property(&self, property: Property) -> StoreResult<Property> {
    self.inner.create_property(property).await
  }
  async fn update_property(&self, property: Property) -> StoreResult<Property> {
    self.inner.update_property(property).await
  }
  async fn set_property_status(&self, id: PropertyId, status: PropertyStatus) -> StoreResult<()> {
    self.status_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_status {
      return Err(StoreError::Unavailable("property store down".to_string()));
    }
    self.inner.set_property_status(id, status).await
  }
  async fn delete_property(&self, id: PropertyId) -> StoreResult<()> {
    self.inner.delete_property(id).await
  }
}
