// Archivo: service/users.rs
use super::{not_found, CrmService};
use crate::errors::Result;
use crate::guard::{Action, ResourceKind};
use crm_domain::ids::UserId;
use crm_domain::{Claims, User};

impl CrmService {
  pub async fn list_users(&self, claims: &Claims) -> Result<Vec<User>> {
    self.guard.require(claims, Action::Read, ResourceKind::User, None)?;
    Ok(self.stores.users.list_users().await?)
  }

  pub async fn get_user(&self, claims: &Claims, id: UserId) -> Result<User> {
    self.guard.require(claims, Action::Read, ResourceKind::User, Some(id))?;
    self.stores.users.get_user(id).await?.ok_or_else(|| not_found("user", id))
  }
}
