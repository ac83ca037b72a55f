// role.rs
use crate::ids::{RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nombre del rol gerencial en la tabla `roles`.
pub const RECEPTION_ROLE_NAME: &str = "Reception";
/// Nombre del rol restringido en la tabla `roles`.
pub const SALES_AGENT_ROLE_NAME: &str = "Sales_Agent";

/// Roles reconocidos por el motor. Cualquier otro `role_id` se trata como
/// desconocido y se deniega.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
  Reception,
  SalesAgent,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Role::Reception => write!(f, "{}", RECEPTION_ROLE_NAME),
      Role::SalesAgent => write!(f, "{}", SALES_AGENT_ROLE_NAME),
    }
  }
}

/// Actor autenticado de la operación en curso. Se pasa explícitamente a cada
/// llamada del motor; nunca se lee de estado global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claims {
  pub user_id: UserId,
  pub role_id: RoleId,
}

impl Claims {
  pub fn new(user_id: UserId, role_id: RoleId) -> Self {
    Self { user_id, role_id }
  }
}
