// Archivo: service/properties.rs
use super::{not_found, CrmService};
use crate::errors::{EngineError, Result};
use crate::guard::{Action, ResourceKind};
use crm_domain::ids::PropertyId;
use crm_domain::{Claims, Property, PropertyStatus};
use tracing::info;

impl CrmService {
  /// Toda propiedad nueva entra como `Available`.
  pub async fn create_property(&self, claims: &Claims, mut property: Property) -> Result<Property> {
    self.guard.require(claims, Action::Create, ResourceKind::Property, None)?;
    property.validate()?;
    property.id = 0;
    property.status = PropertyStatus::Available;
    let created = self.stores.properties.create_property(property).await?;
    info!(property_id = created.id, user_id = claims.user_id, "property created");
    Ok(created)
  }

  pub async fn get_property(&self, claims: &Claims, id: PropertyId) -> Result<Property> {
    self.guard.require(claims, Action::Read, ResourceKind::Property, None)?;
    self.stores.properties.get_property(id).await?.ok_or_else(|| not_found("property", id))
  }

  pub async fn list_properties(&self, claims: &Claims) -> Result<Vec<Property>> {
    self.guard.require(claims, Action::Read, ResourceKind::Property, None)?;
    Ok(self.stores.properties.list_properties().await?)
  }

  /// El estado sólo cambia por el cierre de un deal; aquí debe coincidir con
  /// el persistido.
  pub async fn update_property(&self, claims: &Claims, property: Property) -> Result<Property> {
    self.guard.require(claims, Action::Update, ResourceKind::Property, None)?;
    let existing = self.stores
                       .properties
                       .get_property(property.id)
                       .await?
                       .ok_or_else(|| not_found("property", property.id))?;
    if property.status != existing.status {
      return Err(EngineError::Validation(format!("property status cannot be changed from {} to {} directly",
                                                 existing.status, property.status)));
    }
    property.validate()?;
    Ok(self.stores.properties.update_property(property).await?)
  }

  pub async fn delete_property(&self, claims: &Claims, id: PropertyId) -> Result<()> {
    self.guard.require(claims, Action::Delete, ResourceKind::Property, None)?;
    self.stores.properties.delete_property(id).await?;
    info!(property_id = id, user_id = claims.user_id, "property deleted");
    Ok(())
  }
}
