// Archivo: config.rs
// Propósito: cargar `EngineConfig` (YAML + variables de entorno) y resolver
// una sola vez los ids de rol (`RoleConfig`).
use crate::errors::{EngineError, Result};
use crm_domain::ids::RoleId;
use crm_domain::{RoleDirectory, Role, RECEPTION_ROLE_NAME, SALES_AGENT_ROLE_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";
pub const ENV_CONFIG_PATH: &str = "CRM_CONFIG";
pub const ENV_DB_URL: &str = "CRM_DB_URL";
pub const ENV_LOG: &str = "CRM_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  pub level: String,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self { level: "info".to_string() }
  }
}

/// Nombres de rol tal como figuran en la tabla `roles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
  pub reception: String,
  pub sales_agent: String,
}

impl Default for RolesConfig {
  fn default() -> Self {
    Self { reception: RECEPTION_ROLE_NAME.to_string(), sales_agent: SALES_AGENT_ROLE_NAME.to_string() }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub database: DatabaseConfig,
  pub logging: LoggingConfig,
  pub roles: RolesConfig,
}

impl EngineConfig {
  /// Carga `.env`, luego el YAML (`CRM_CONFIG` o `config.yml`) y por último
  /// aplica `CRM_DB_URL` / `CRM_LOG`.
  pub fn load() -> Result<Self> {
    dotenvy::dotenv().ok();
    let path = std::env::var(ENV_CONFIG_PATH).map(PathBuf::from)
                                             .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut cfg = Self::from_path(&path)?;
    cfg.apply_overrides(|k| std::env::var(k).ok());
    Ok(cfg)
  }

  /// Archivo inexistente -> valores por defecto; archivo mal formado -> error.
  pub fn from_path(path: &Path) -> Result<Self> {
    if !path.exists() {
      debug!(path = %path.display(), "config file not found, using defaults");
      return Ok(Self::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("reading {}: {}", path.display(), e)))?;
    let cfg = Self::from_yaml_str(&raw).map_err(|e| match e {
                                         EngineError::Config(msg) => {
                                           EngineError::Config(format!("parsing {}: {}", path.display(), msg))
                                         }
                                         other => other,
                                       })?;
    info!(path = %path.display(), "configuration loaded");
    Ok(cfg)
  }

  pub fn from_yaml_str(raw: &str) -> Result<Self> {
    if raw.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(raw).map_err(|e| EngineError::Config(e.to_string()))
  }

  /// Aplica overrides de entorno usando `lookup` (inyectable en tests).
  pub fn apply_overrides<F>(&mut self, lookup: F)
    where F: Fn(&str) -> Option<String>
  {
    if let Some(url) = lookup(ENV_DB_URL).filter(|v| !v.trim().is_empty()) {
      self.database.url = Some(url);
    }
    if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
      self.logging.level = level;
    }
  }
}

/// Ids de rol resueltos al arrancar. Inmutable y `Copy`: se inyecta en cada
/// componente del motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleConfig {
  pub reception_id: RoleId,
  pub sales_agent_id: RoleId,
}

impl RoleConfig {
  pub fn new(reception_id: RoleId, sales_agent_id: RoleId) -> Self {
    Self { reception_id, sales_agent_id }
  }

  /// Resuelve ambos roles por nombre. Un rol ausente es fatal.
  pub async fn resolve(directory: &dyn RoleDirectory, names: &RolesConfig) -> Result<Self> {
    let reception_id = Self::lookup(directory, &names.reception).await?;
    let sales_agent_id = Self::lookup(directory, &names.sales_agent).await?;
    if reception_id == sales_agent_id {
      return Err(EngineError::Config(format!("roles '{}' and '{}' resolve to the same id {}",
                                             names.reception, names.sales_agent, reception_id)));
    }
    info!(reception_id, sales_agent_id, "roles resolved");
    Ok(Self { reception_id, sales_agent_id })
  }

  async fn lookup(directory: &dyn RoleDirectory, name: &str) -> Result<RoleId> {
    directory.role_id_by_name(name)
             .await
             .map_err(|e| EngineError::Config(format!("resolving role '{}': {}", name, e)))?
             .ok_or_else(|| EngineError::Config(format!("role '{}' not found", name)))
  }

  /// Rol reconocido para un `role_id`, o `None` si es desconocido.
  pub fn role_of(&self, role_id: RoleId) -> Option<Role> {
    if role_id == self.reception_id {
      Some(Role::Reception)
    } else if role_id == self.sales_agent_id {
      Some(Role::SalesAgent)
    } else {
      None
    }
  }
}
