// repository.rs
// Contratos de persistencia por entidad. Las implementaciones concretas
// (memoria, SQLite) deben respetar las mismas restricciones de admisión.
use crate::ids::{ContactId, DealId, LeadId, PropertyId, RoleId, TaskId, UserId};
use crate::{Contact, Deal, Lead, LeadStatusCounts, PipelineStageRow, Property, PropertyStatus, SalesSummary, SourceLeadRow,
            SourceSalesRow, StoreError, Task, User};
use async_trait::async_trait;

pub type StoreResult<T> = Result<T, StoreError>;

/// Resolución de roles por nombre, usada una sola vez al arrancar.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
  async fn role_id_by_name(&self, name: &str) -> StoreResult<Option<RoleId>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
  /// Todos los usuarios, ordenados por `username`.
  async fn list_users(&self) -> StoreResult<Vec<User>>;
  /// Usuarios de un rol, ordenados por `username`.
  async fn list_users_by_role(&self, role_id: RoleId) -> StoreResult<Vec<User>>;
  async fn create_user(&self, user: User) -> StoreResult<User>;
  async fn update_user(&self, user: User) -> StoreResult<User>;
  /// Falla con `Referenced` si el usuario tiene leads o tareas asignadas.
  async fn delete_user(&self, id: UserId) -> StoreResult<()>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
  async fn get_contact(&self, id: ContactId) -> StoreResult<Option<Contact>>;
  async fn list_contacts(&self) -> StoreResult<Vec<Contact>>;
  /// Contactos alcanzables a través de algún lead asignado a `user_id`.
  async fn list_contacts_for_agent(&self, user_id: UserId) -> StoreResult<Vec<Contact>>;
  async fn create_contact(&self, contact: Contact) -> StoreResult<Contact>;
  async fn update_contact(&self, contact: Contact) -> StoreResult<Contact>;
  /// Falla con `Referenced` si algún lead apunta al contacto.
  async fn delete_contact(&self, id: ContactId) -> StoreResult<()>;
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
  async fn get_property(&self, id: PropertyId) -> StoreResult<Option<Property>>;
  async fn list_properties(&self) -> StoreResult<Vec<Property>>;
  async fn create_property(&self, property: Property) -> StoreResult<Property>;
  async fn update_property(&self, property: Property) -> StoreResult<Property>;
  async fn set_property_status(&self, id: PropertyId, status: PropertyStatus) -> StoreResult<()>;
  /// Falla con `Referenced` si algún lead o deal apunta a la propiedad.
  async fn delete_property(&self, id: PropertyId) -> StoreResult<()>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
  async fn get_lead(&self, id: LeadId) -> StoreResult<Option<Lead>>;
  async fn list_leads(&self) -> StoreResult<Vec<Lead>>;
  async fn list_leads_for_user(&self, user_id: UserId) -> StoreResult<Vec<Lead>>;

  /// Inserta el lead. Bajo el mismo bloqueo/transacción re-verifica que un
  /// lead abierto no conviva con otro lead abierto del mismo contacto y que la
  /// propiedad referenciada no esté tomada por otro lead o deal abierto.
  async fn create_lead(&self, lead: Lead) -> StoreResult<Lead>;

  /// Actualiza el lead aplicando la unicidad de lead abierto por contacto y
  /// por propiedad (entre leads).
  async fn update_lead(&self, lead: Lead) -> StoreResult<Lead>;

  /// Falla con `Referenced` si algún deal apunta al lead.
  async fn delete_lead(&self, id: LeadId) -> StoreResult<()>;

  async fn has_open_lead_for_contact(&self, contact_id: ContactId) -> StoreResult<bool>;
  async fn has_open_lead_for_property(&self, property_id: PropertyId) -> StoreResult<bool>;
  async fn count_leads_by_status_for_user(&self, user_id: UserId) -> StoreResult<LeadStatusCounts>;
  /// Leads con su contacto y asignado, del más reciente al más antiguo. Los
  /// leads sin contacto, asignado o estado conocido no aparecen.
  async fn source_lead_rows(&self) -> StoreResult<Vec<SourceLeadRow>>;
}

#[async_trait]
pub trait DealStore: Send + Sync {
  async fn get_deal(&self, id: DealId) -> StoreResult<Option<Deal>>;
  async fn list_deals(&self) -> StoreResult<Vec<Deal>>;
  /// Deals creados por `user_id`.
  async fn list_deals_for_user(&self, user_id: UserId) -> StoreResult<Vec<Deal>>;
  async fn create_deal(&self, deal: Deal) -> StoreResult<Deal>;
  async fn update_deal(&self, deal: Deal) -> StoreResult<Deal>;
  async fn delete_deal(&self, id: DealId) -> StoreResult<()>;
  async fn has_open_deal_for_property(&self, property_id: PropertyId) -> StoreResult<bool>;
  /// Deals Closed-Won cuyo lead está asignado a `user_id`.
  async fn sales_summary_for_user(&self, user_id: UserId) -> StoreResult<SalesSummary>;
  /// Deals Closed-Won agrupados por `source_id` del lead, de mayor a menor
  /// monto (empates por `source_id`).
  async fn sales_by_source(&self) -> StoreResult<Vec<SourceSalesRow>>;
  /// Conteo y monto por estado, una fila por etapa en el orden de
  /// `DealStatus::ALL`. Con `created_by` sólo cuenta los deals de ese usuario.
  async fn deal_pipeline(&self, created_by: Option<UserId>) -> StoreResult<Vec<PipelineStageRow>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
  async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>>;
  async fn list_tasks(&self) -> StoreResult<Vec<Task>>;
  async fn list_tasks_for_user(&self, user_id: UserId) -> StoreResult<Vec<Task>>;
  async fn create_task(&self, task: Task) -> StoreResult<Task>;
  async fn update_task(&self, task: Task) -> StoreResult<Task>;
  async fn delete_task(&self, id: TaskId) -> StoreResult<()>;
}

/// Un único backend que cubre todas las tablas.
pub trait CrmRepository:
  RoleDirectory + UserStore + ContactStore + PropertyStore + LeadStore + DealStore + TaskStore
{
}

impl<T> CrmRepository for T where T: RoleDirectory + UserStore + ContactStore + PropertyStore + LeadStore + DealStore + TaskStore
{
}
