// Archivo: service/mod.rs
// Propósito: `CrmService`, la capa que invocan los handlers. Cada operación
// recibe `&Claims` y sigue el orden guard -> validador -> store.
mod contacts;
mod deals;
mod leads;
mod properties;
mod reports;
mod tasks;
mod users;

use crate::availability::PropertyAvailabilityIndex;
use crate::config::{RoleConfig, RolesConfig};
use crate::deal_lifecycle::DealLifecycleValidator;
use crate::errors::{EngineError, Result};
use crate::guard::PermissionGuard;
use crate::lead_lifecycle::LeadLifecycleValidator;
use crate::report::ReportAggregator;
use crate::stores::Stores;
use crm_domain::ids::UserId;
use crm_domain::{Claims, CrmRepository};
use std::sync::Arc;

/// Servicio de alto nivel sobre todas las entidades del CRM.
#[derive(Clone)]
pub struct CrmService {
  stores: Stores,
  guard: PermissionGuard,
  availability: PropertyAvailabilityIndex,
  lead_validator: LeadLifecycleValidator,
  deal_validator: DealLifecycleValidator,
  reports: ReportAggregator,
}

impl CrmService {
  /// Construye el servicio con roles ya resueltos.
  pub fn new(stores: Stores, roles: RoleConfig) -> Self {
    let guard = PermissionGuard::new(roles);
    let availability = PropertyAvailabilityIndex::new(stores.leads.clone(), stores.deals.clone());
    let lead_validator = LeadLifecycleValidator::new(roles,
                                                     stores.contacts.clone(),
                                                     stores.users.clone(),
                                                     stores.properties.clone(),
                                                     stores.leads.clone(),
                                                     availability.clone());
    let deal_validator = DealLifecycleValidator::new(stores.leads.clone(), stores.properties.clone());
    let reports = ReportAggregator::new(guard, stores.users.clone(), stores.leads.clone(), stores.deals.clone());
    Self { stores, guard, availability, lead_validator, deal_validator, reports }
  }

  /// Resuelve los roles desde el propio store y construye el servicio.
  pub async fn bootstrap(stores: Stores, names: &RolesConfig) -> Result<Self> {
    let roles = RoleConfig::resolve(stores.roles.as_ref(), names).await?;
    Ok(Self::new(stores, roles))
  }

  /// Atajo para un único backend que implementa todos los stores.
  pub async fn from_repository<R>(repo: Arc<R>, names: &RolesConfig) -> Result<Self>
    where R: CrmRepository + 'static
  {
    Self::bootstrap(Stores::from_repository(repo), names).await
  }

  pub fn roles(&self) -> RoleConfig {
    self.guard.roles()
  }

  pub fn availability(&self) -> &PropertyAvailabilityIndex {
    &self.availability
  }

  fn is_reception(&self, claims: &Claims) -> bool {
    self.guard.is_reception(claims)
  }
}

fn not_found(kind: &str, id: i64) -> EngineError {
  EngineError::NotFound(format!("{} {}", kind, id))
}

// Dueño efectivo cuando la fila no tiene uno: nadie.
fn owner_or_nobody(owner: Option<UserId>) -> Option<UserId> {
  Some(owner.unwrap_or(0))
}
