//! Crate `crm-engine`: motor de reglas de consistencia del CRM
//!
//! Componentes:
//! - `PermissionGuard`: decisión pura de autorización por rol y dueño.
//! - `PropertyAvailabilityIndex`: ¿la propiedad está comprometida por un lead
//!   abierto o un deal no terminal?
//! - `LeadLifecycleValidator` / `DealLifecycleValidator`: reglas de admisión
//!   en orden fijo; gana el primer fallo.
//! - `ReportAggregator`: reportes por agente con fan-out concurrente y
//!   cancelación.
//! - `CrmService`: orquestación guard -> validador -> store por entidad.
//!
//! Los ids de rol se resuelven una vez al arrancar (`RoleConfig`) y se
//! inyectan; el actor (`Claims`) viaja explícito en cada llamada.
//!
//! Ejemplo rápido:
//! ```rust,no_run
//! use crm_domain::{Claims, DomainStubs, SEED_RECEPTION_ROLE_ID};
//! use crm_engine::{CrmService, RolesConfig};
//! use std::sync::Arc;
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Arc::new(DomainStubs::sample_repo().await?);
//! let service = CrmService::from_repository(repo, &RolesConfig::default()).await?;
//! let leads = service.list_leads(&Claims::new(1, SEED_RECEPTION_ROLE_ID)).await?;
//! # let _ = leads;
//! # Ok(())
//! # }
//! ```
pub mod availability;
pub mod config;
pub mod deal_lifecycle;
pub mod errors;
pub mod guard;
pub mod lead_lifecycle;
pub mod report;
pub mod service;
pub mod stores;

pub use availability::PropertyAvailabilityIndex;
pub use config::{EngineConfig, RoleConfig, RolesConfig};
pub use deal_lifecycle::{DealLifecycleValidator, DealWriteOutcome, SideEffect, SideEffectOutcome, SideEffectResult};
pub use errors::{EngineError, ErrorKind, Result};
pub use guard::{Action, PermissionGuard, ResourceKind};
pub use lead_lifecycle::LeadLifecycleValidator;
pub use report::ReportAggregator;
pub use service::CrmService;
pub use stores::Stores;
pub use tokio_util::sync::CancellationToken;
