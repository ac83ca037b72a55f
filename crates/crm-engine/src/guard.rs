// Archivo: guard.rs
// Propósito: decisión pura de autorización por rol y dueño del recurso.
use crate::config::RoleConfig;
use crate::errors::{EngineError, Result};
use crm_domain::ids::UserId;
use crm_domain::{Claims, Role};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
  Create,
  Read,
  Update,
  Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
  Contact,
  Property,
  Lead,
  Deal,
  Task,
  User,
  Report,
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Guard de permisos. `owner` es el usuario asignado (Lead/Task/Report) o el
/// creador (Deal/Contact); `None` significa una lectura de lista que la capa
/// de servicio filtra por dueño.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGuard {
  roles: RoleConfig,
}

impl PermissionGuard {
  pub fn new(roles: RoleConfig) -> Self {
    Self { roles }
  }

  pub fn roles(&self) -> RoleConfig {
    self.roles
  }

  /// Nunca falla: devuelve `false` cuando la acción no está permitida.
  pub fn authorize(&self, claims: &Claims, action: Action, resource: ResourceKind, owner: Option<UserId>) -> bool {
    match self.roles.role_of(claims.role_id) {
      Some(Role::Reception) => true,
      Some(Role::SalesAgent) => Self::sales_agent_allows(claims.user_id, action, resource, owner),
      None => false,
    }
  }

  fn sales_agent_allows(actor: UserId, action: Action, resource: ResourceKind, owner: Option<UserId>) -> bool {
    use Action::*;
    use ResourceKind::*;
    let owns = owner == Some(actor);
    match (action, resource) {
      // Catálogo de propiedades: lectura libre.
      (Read, Property) => true,
      (Read, User) => false,
      (Read, Report) => owns,
      (Read, Contact | Lead | Deal | Task) => owner.is_none() || owns,
      // El agente que crea un deal queda como su dueño.
      (Create, Deal) => true,
      (Update, Deal | Task) => owns,
      _ => false,
    }
  }

  /// Igual que `authorize` pero traduce la negación a `Forbidden`.
  pub fn require(&self, claims: &Claims, action: Action, resource: ResourceKind, owner: Option<UserId>) -> Result<()> {
    if self.authorize(claims, action, resource, owner) {
      return Ok(());
    }
    warn!(user_id = claims.user_id,
          role_id = claims.role_id,
          action = %action,
          resource = %resource,
          owner = ?owner,
          "authorization denied");
    Err(EngineError::Forbidden(format!("{} on {} not allowed for user {}", action, resource, claims.user_id)))
  }

  /// Rol reconocido del actor.
  pub fn role_of(&self, claims: &Claims) -> Option<Role> {
    self.roles.role_of(claims.role_id)
  }

  pub fn is_reception(&self, claims: &Claims) -> bool {
    self.role_of(claims) == Some(Role::Reception)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const RECEPTION: i64 = 2;
  const AGENT: i64 = 1;

  fn guard() -> PermissionGuard {
    PermissionGuard::new(RoleConfig::new(RECEPTION, AGENT))
  }

  #[test]
  fn reception_may_do_anything() {
    let g = guard();
    let c = Claims::new(1, RECEPTION);
    for action in [Action::Create, Action::Read, Action::Update, Action::Delete] {
      assert!(g.authorize(&c, action, ResourceKind::Lead, Some(99)));
      assert!(g.authorize(&c, action, ResourceKind::User, None));
    }
  }

  #[test]
  fn agent_reads_and_updates_only_own_records() {
    let g = guard();
    let c = Claims::new(7, AGENT);
    assert!(g.authorize(&c, Action::Read, ResourceKind::Lead, Some(7)));
    assert!(!g.authorize(&c, Action::Read, ResourceKind::Lead, Some(9)));
    assert!(g.authorize(&c, Action::Read, ResourceKind::Deal, None));
    assert!(g.authorize(&c, Action::Update, ResourceKind::Deal, Some(7)));
    assert!(!g.authorize(&c, Action::Update, ResourceKind::Task, Some(9)));
    assert!(g.authorize(&c, Action::Read, ResourceKind::Property, Some(3)));
  }

  #[test]
  fn agent_may_open_deals() {
    let g = guard();
    let c = Claims::new(7, AGENT);
    assert!(g.authorize(&c, Action::Create, ResourceKind::Deal, None));
    assert!(!g.authorize(&c, Action::Delete, ResourceKind::Deal, None));
  }

  #[test]
  fn agent_cannot_write_catalog_or_leads() {
    let g = guard();
    let c = Claims::new(7, AGENT);
    assert!(!g.authorize(&c, Action::Update, ResourceKind::Lead, Some(7)));
    assert!(!g.authorize(&c, Action::Create, ResourceKind::Lead, None));
    assert!(!g.authorize(&c, Action::Create, ResourceKind::Contact, None));
    assert!(!g.authorize(&c, Action::Create, ResourceKind::Task, None));
    assert!(!g.authorize(&c, Action::Update, ResourceKind::Property, None));
    assert!(!g.authorize(&c, Action::Delete, ResourceKind::Deal, Some(7)));
    assert!(!g.authorize(&c, Action::Delete, ResourceKind::Task, Some(7)));
    assert!(!g.authorize(&c, Action::Read, ResourceKind::Report, None));
    assert!(g.authorize(&c, Action::Read, ResourceKind::Report, Some(7)));
  }

  #[test]
  fn unknown_role_fails_closed() {
    let g = guard();
    let c = Claims::new(7, 42);
    assert!(!g.authorize(&c, Action::Read, ResourceKind::Property, None));
    assert!(matches!(g.require(&c, Action::Read, ResourceKind::Property, None), Err(EngineError::Forbidden(_))));
  }
}
