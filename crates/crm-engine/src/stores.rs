// Archivo: stores.rs
// Propósito: agrupar los stores por entidad como objetos de trait para
// inyectarlos en los componentes del motor.
use crm_domain::{ContactStore, CrmRepository, DealStore, LeadStore, PropertyStore, RoleDirectory, TaskStore, UserStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct Stores {
  pub roles: Arc<dyn RoleDirectory>,
  pub users: Arc<dyn UserStore>,
  pub contacts: Arc<dyn ContactStore>,
  pub properties: Arc<dyn PropertyStore>,
  pub leads: Arc<dyn LeadStore>,
  pub deals: Arc<dyn DealStore>,
  pub tasks: Arc<dyn TaskStore>,
}

impl Stores {
  /// Usa un único backend para todas las tablas.
  pub fn from_repository<R>(repo: Arc<R>) -> Self
    where R: CrmRepository + 'static
  {
    Self { roles: repo.clone(),
           users: repo.clone(),
           contacts: repo.clone(),
           properties: repo.clone(),
           leads: repo.clone(),
           deals: repo.clone(),
           tasks: repo }
  }
}
