use crate::schema::{contacts, deals, leads, properties, roles, tasks, users};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_domain::ids::{ContactId, DealId, LeadId, PropertyId, RoleId, TaskId, UserId};
use crm_domain::{Contact, ContactStore, Deal, DealStatus, DealStore, Lead, LeadStatus, LeadStatusCounts, LeadStore,
                 PipelineStageRow, Property, PropertyStatus, PropertyStore, RoleDirectory, SalesSummary, SourceLeadRow,
                 SourceSalesRow, StoreError, StoreResult, Task, TaskStore, User, UserStore, OPEN_LEAD_PER_CONTACT,
                 PROPERTY_EXCLUSIVITY};
use diesel::connection::SimpleConnection;
use diesel::dsl::{count_star, exists, sum};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const CLOSED_DEAL_STATUSES: [&str; 2] = ["Closed-Won", "Closed-Lost"];

/// Error interno de las operaciones Diesel; se traduce a `StoreError` al
/// salir del repositorio.
#[derive(Debug, Error)]
enum PersistError {
  #[error("db: {0}")]
  Db(#[from] DieselError),
  #[error("{0}")]
  Store(StoreError),
}

impl From<PersistError> for StoreError {
  fn from(e: PersistError) -> Self {
    match e {
      PersistError::Store(s) => s,
      PersistError::Db(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
        // SQLite: "UNIQUE constraint failed: leads.contact_id"
        let msg = info.message();
        if msg.contains("leads.contact_id") {
          StoreError::UniqueViolation(OPEN_LEAD_PER_CONTACT)
        } else if msg.contains("leads.property_id") {
          StoreError::UniqueViolation(PROPERTY_EXCLUSIVITY)
        } else {
          StoreError::Unavailable(format!("db: {}", msg))
        }
      }
      PersistError::Db(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info)) => {
        StoreError::Referenced(format!("db: {}", info.message()))
      }
      PersistError::Db(e) => StoreError::Unavailable(format!("db: {}", e)),
    }
  }
}

fn not_found(kind: &str, id: i64) -> PersistError {
  PersistError::Store(StoreError::NotFound(format!("{} {}", kind, id)))
}

fn referenced(msg: String) -> PersistError {
  PersistError::Store(StoreError::Referenced(msg))
}

fn corrupt(msg: String) -> PersistError {
  PersistError::Store(StoreError::Unavailable(format!("corrupt row: {}", msg)))
}

fn ts(dt: &DateTime<Utc>) -> i64 {
  dt.timestamp_millis()
}

fn from_ts(ms: i64) -> DateTime<Utc> {
  DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Pragmas por conexión: claves foráneas y espera ante bloqueo de escritura.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        .map_err(diesel::r2d2::Error::QueryError)
  }
}

// Filas Diesel

#[derive(Debug, Queryable)]
struct UserRow {
  id: i64,
  username: String,
  email: String,
  role_id: i64,
  created_at_ts: i64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = users)]
struct UserWrite {
  username: String,
  email: String,
  role_id: i64,
  created_at_ts: i64,
}

impl UserRow {
  fn into_user(self) -> User {
    User { id: self.id, username: self.username, email: self.email, role_id: self.role_id, created_at: from_ts(self.created_at_ts) }
  }
}

impl From<&User> for UserWrite {
  fn from(u: &User) -> Self {
    UserWrite { username: u.username.clone(), email: u.email.clone(), role_id: u.role_id, created_at_ts: ts(&u.created_at) }
  }
}

#[derive(Debug, Queryable)]
struct ContactRow {
  id: i64,
  first_name: String,
  last_name: String,
  email: Option<String>,
  primary_phone: String,
  created_by: Option<i64>,
  created_at_ts: i64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = contacts, treat_none_as_null = true)]
struct ContactWrite {
  first_name: String,
  last_name: String,
  email: Option<String>,
  primary_phone: String,
  created_by: Option<i64>,
  created_at_ts: i64,
}

impl ContactRow {
  fn into_contact(self) -> Contact {
    Contact { id: self.id,
              first_name: self.first_name,
              last_name: self.last_name,
              email: self.email,
              primary_phone: self.primary_phone,
              created_by: self.created_by,
              created_at: from_ts(self.created_at_ts) }
  }
}

impl From<&Contact> for ContactWrite {
  fn from(c: &Contact) -> Self {
    ContactWrite { first_name: c.first_name.clone(),
                   last_name: c.last_name.clone(),
                   email: c.email.clone(),
                   primary_phone: c.primary_phone.clone(),
                   created_by: c.created_by,
                   created_at_ts: ts(&c.created_at) }
  }
}

#[derive(Debug, Queryable)]
struct PropertyRow {
  id: i64,
  name: String,
  site_id: i64,
  property_type_id: i64,
  unit_no: Option<String>,
  size_sqft: Option<f64>,
  price: f64,
  status: String,
  created_at_ts: i64,
  updated_at_ts: i64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = properties, treat_none_as_null = true)]
struct PropertyWrite {
  name: String,
  site_id: i64,
  property_type_id: i64,
  unit_no: Option<String>,
  size_sqft: Option<f64>,
  price: f64,
  status: String,
  created_at_ts: i64,
  updated_at_ts: i64,
}

impl PropertyRow {
  fn into_property(self) -> Result<Property, PersistError> {
    let status = self.status.parse::<PropertyStatus>().map_err(|e| corrupt(e.to_string()))?;
    Ok(Property { id: self.id,
                  name: self.name,
                  site_id: self.site_id,
                  property_type_id: self.property_type_id,
                  unit_no: self.unit_no,
                  size_sqft: self.size_sqft,
                  price: self.price,
                  status,
                  created_at: from_ts(self.created_at_ts),
                  updated_at: from_ts(self.updated_at_ts) })
  }
}

impl From<&Property> for PropertyWrite {
  fn from(p: &Property) -> Self {
    PropertyWrite { name: p.name.clone(),
                    site_id: p.site_id,
                    property_type_id: p.property_type_id,
                    unit_no: p.unit_no.clone(),
                    size_sqft: p.size_sqft,
                    price: p.price,
                    status: p.status.as_str().to_string(),
                    created_at_ts: ts(&p.created_at),
                    updated_at_ts: ts(&p.updated_at) }
  }
}

#[derive(Debug, Queryable)]
struct LeadRow {
  id: i64,
  contact_id: i64,
  property_id: Option<i64>,
  source_id: i64,
  status_id: i64,
  assigned_to: i64,
  notes: Option<String>,
  created_at_ts: i64,
  updated_at_ts: i64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = leads, treat_none_as_null = true)]
struct LeadWrite {
  contact_id: i64,
  property_id: Option<i64>,
  source_id: i64,
  status_id: i64,
  assigned_to: i64,
  notes: Option<String>,
  created_at_ts: i64,
  updated_at_ts: i64,
}

impl LeadRow {
  fn into_lead(self) -> Lead {
    Lead { id: self.id,
           contact_id: self.contact_id,
           property_id: self.property_id,
           source_id: self.source_id,
           status_id: self.status_id,
           assigned_to: self.assigned_to,
           notes: self.notes,
           created_at: from_ts(self.created_at_ts),
           updated_at: from_ts(self.updated_at_ts) }
  }
}

impl From<&Lead> for LeadWrite {
  fn from(l: &Lead) -> Self {
    LeadWrite { contact_id: l.contact_id,
                property_id: l.referenced_property(),
                source_id: l.source_id,
                status_id: l.status_id,
                assigned_to: l.assigned_to,
                notes: l.notes.clone(),
                created_at_ts: ts(&l.created_at),
                updated_at_ts: ts(&l.updated_at) }
  }
}

#[derive(Debug, Queryable)]
struct DealRow {
  id: i64,
  lead_id: i64,
  property_id: i64,
  stage_id: i64,
  deal_status: String,
  deal_amount: f64,
  deal_date_ts: i64,
  closing_date_ts: Option<i64>,
  notes: Option<String>,
  created_by: Option<i64>,
  created_at_ts: i64,
  updated_at_ts: i64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = deals, treat_none_as_null = true)]
struct DealWrite {
  lead_id: i64,
  property_id: i64,
  stage_id: i64,
  deal_status: String,
  deal_amount: f64,
  deal_date_ts: i64,
  closing_date_ts: Option<i64>,
  notes: Option<String>,
  created_by: Option<i64>,
  created_at_ts: i64,
  updated_at_ts: i64,
}

impl DealRow {
  fn into_deal(self) -> Result<Deal, PersistError> {
    let deal_status = self.deal_status.parse::<DealStatus>().map_err(|e| corrupt(e.to_string()))?;
    Ok(Deal { id: self.id,
              lead_id: self.lead_id,
              property_id: self.property_id,
              stage_id: self.stage_id,
              deal_status,
              deal_amount: self.deal_amount,
              deal_date: from_ts(self.deal_date_ts),
              closing_date: self.closing_date_ts.map(from_ts),
              notes: self.notes,
              created_by: self.created_by,
              created_at: from_ts(self.created_at_ts),
              updated_at: from_ts(self.updated_at_ts) })
  }
}

impl From<&Deal> for DealWrite {
  fn from(d: &Deal) -> Self {
    DealWrite { lead_id: d.lead_id,
                property_id: d.property_id,
                stage_id: d.stage_id,
                deal_status: d.deal_status.as_str().to_string(),
                deal_amount: d.deal_amount,
                deal_date_ts: ts(&d.deal_date),
                closing_date_ts: d.closing_date.as_ref().map(ts),
                notes: d.notes.clone(),
                created_by: d.created_by,
                created_at_ts: ts(&d.created_at),
                updated_at_ts: ts(&d.updated_at) }
  }
}

#[derive(Debug, Queryable)]
struct TaskRow {
  id: i64,
  task_name: String,
  task_description: Option<String>,
  due_date_ts: i64,
  status: String,
  assigned_to: i64,
  lead_id: Option<i64>,
  deal_id: Option<i64>,
  created_at_ts: i64,
  updated_at_ts: i64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = tasks, treat_none_as_null = true)]
struct TaskWrite {
  task_name: String,
  task_description: Option<String>,
  due_date_ts: i64,
  status: String,
  assigned_to: i64,
  lead_id: Option<i64>,
  deal_id: Option<i64>,
  created_at_ts: i64,
  updated_at_ts: i64,
}

impl TaskRow {
  fn into_task(self) -> Task {
    Task { id: self.id,
           task_name: self.task_name,
           task_description: self.task_description,
           due_date: from_ts(self.due_date_ts),
           status: self.status,
           assigned_to: self.assigned_to,
           lead_id: self.lead_id,
           deal_id: self.deal_id,
           created_at: from_ts(self.created_at_ts),
           updated_at: from_ts(self.updated_at_ts) }
  }
}

impl From<&Task> for TaskWrite {
  fn from(t: &Task) -> Self {
    TaskWrite { task_name: t.task_name.clone(),
                task_description: t.task_description.clone(),
                due_date_ts: ts(&t.due_date),
                status: t.status.clone(),
                assigned_to: t.assigned_to,
                lead_id: t.lead_id,
                deal_id: t.deal_id,
                created_at_ts: ts(&t.created_at),
                updated_at_ts: ts(&t.updated_at) }
  }
}

// Consultas compartidas (se usan dentro y fuera de transacciones).

/// Fila del join leads + contacts + users del reporte por origen.
#[derive(Debug, Queryable)]
struct SourceLeadJoin {
  lead_id: i64,
  created_at_ts: i64,
  first_name: String,
  last_name: String,
  primary_phone: String,
  email: Option<String>,
  source_id: i64,
  username: String,
  status_id: i64,
}

impl SourceLeadJoin {
  // Estados desconocidos quedan fuera, igual que un join contra lead_statuses.
  fn into_row(self) -> Option<SourceLeadRow> {
    let status = LeadStatus::from_id(self.status_id).ok()?;
    Some(SourceLeadRow { lead_id: self.lead_id,
                         lead_date: from_ts(self.created_at_ts),
                         contact_name: format!("{} {}", self.first_name, self.last_name).trim().to_string(),
                         contact_phone: self.primary_phone,
                         contact_email: self.email,
                         source_id: self.source_id,
                         assigned_employee: self.username,
                         lead_status: status.to_string() })
  }
}

fn open_lead_for_contact(conn: &mut SqliteConnection, contact_id: ContactId, except: LeadId) -> Result<bool, PersistError> {
  Ok(diesel::select(exists(leads::table.filter(leads::contact_id.eq(contact_id))
                                       .filter(leads::status_id.eq_any(LeadStatus::OPEN_IDS))
                                       .filter(leads::id.ne(except)))).get_result(conn)?)
}

fn open_lead_for_property(conn: &mut SqliteConnection, property_id: PropertyId, except: LeadId) -> Result<bool, PersistError> {
  Ok(diesel::select(exists(leads::table.filter(leads::property_id.eq(property_id))
                                       .filter(leads::status_id.eq_any(LeadStatus::OPEN_IDS))
                                       .filter(leads::id.ne(except)))).get_result(conn)?)
}

fn open_deal_for_property(conn: &mut SqliteConnection, property_id: PropertyId) -> Result<bool, PersistError> {
  Ok(diesel::select(exists(deals::table.filter(deals::property_id.eq(property_id))
                                       .filter(deals::deal_status.ne_all(CLOSED_DEAL_STATUSES)))).get_result(conn)?)
}

fn load_lead(conn: &mut SqliteConnection, id: LeadId) -> Result<Option<Lead>, PersistError> {
  Ok(leads::table.find(id).first::<LeadRow>(conn).optional()?.map(LeadRow::into_lead))
}

fn load_deal(conn: &mut SqliteConnection, id: DealId) -> Result<Option<Deal>, PersistError> {
  deals::table.find(id).first::<DealRow>(conn).optional()?.map(DealRow::into_deal).transpose()
}

fn load_property(conn: &mut SqliteConnection, id: PropertyId) -> Result<Option<Property>, PersistError> {
  properties::table.find(id).first::<PropertyRow>(conn).optional()?.map(PropertyRow::into_property).transpose()
}

/// Repositorio Diesel/SQLite que implementa todos los stores del dominio.
#[derive(Clone)]
pub struct DieselCrmRepository {
  pool: Arc<DbPool>,
}

impl DieselCrmRepository {
  /// Abre (o crea) la base, configura el pool y aplica las migraciones.
  pub fn new(database_url: &str) -> Result<Self, StoreError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(4)
                              .connection_customizer(Box::new(SqlitePragmas))
                              .build(manager)
                              .map_err(|e| StoreError::Unavailable(format!("pool: {}", e)))?;
    let repo = DieselCrmRepository { pool: Arc::new(pool) };
    let mut conn = repo.pool.get().map_err(|e| StoreError::Unavailable(format!("pool: {}", e)))?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")
        .map_err(|e| StoreError::Unavailable(format!("db: {}", e)))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Unavailable(format!("migrations: {}", e)))?;
    info!(database_url, "sqlite store ready");
    Ok(repo)
  }

  /// Ejecuta `f` con una conexión del pool en un hilo bloqueante.
  async fn run<T, F>(&self, op: &'static str, f: F) -> StoreResult<T>
    where T: Send + 'static,
          F: FnOnce(&mut SqliteConnection) -> Result<T, PersistError> + Send + 'static
  {
    let pool = self.pool.clone();
    let joined = tokio::task::spawn_blocking(move || {
                   let mut conn = pool.get().map_err(|e| StoreError::Unavailable(format!("pool: {}", e)))?;
                   f(&mut *conn).map_err(StoreError::from)
                 }).await;
    let res = joined.unwrap_or_else(|e| Err(StoreError::Unavailable(format!("blocking task: {}", e))));
    if let Err(StoreError::Unavailable(msg)) = &res {
      error!(op, error = %msg, "sqlite operation failed");
    }
    res
  }
}

#[async_trait]
impl RoleDirectory for DieselCrmRepository {
  async fn role_id_by_name(&self, name: &str) -> StoreResult<Option<RoleId>> {
    let name = name.to_string();
    self.run("role_id_by_name", move |conn| {
          Ok(roles::table.filter(roles::name.eq(name)).select(roles::id).first::<i64>(conn).optional()?)
        })
        .await
  }
}

#[async_trait]
impl UserStore for DieselCrmRepository {
  async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
    self.run("get_user", move |conn| Ok(users::table.find(id).first::<UserRow>(conn).optional()?.map(UserRow::into_user)))
        .await
  }

  async fn list_users(&self) -> StoreResult<Vec<User>> {
    self.run("list_users", |conn| {
          let rows = users::table.order(users::username.asc()).load::<UserRow>(conn)?;
          Ok(rows.into_iter().map(UserRow::into_user).collect())
        })
        .await
  }

  async fn list_users_by_role(&self, role_id: RoleId) -> StoreResult<Vec<User>> {
    self.run("list_users_by_role", move |conn| {
          let rows = users::table.filter(users::role_id.eq(role_id))
                                 .order(users::username.asc())
                                 .load::<UserRow>(conn)?;
          Ok(rows.into_iter().map(UserRow::into_user).collect())
        })
        .await
  }

  async fn create_user(&self, user: User) -> StoreResult<User> {
    self.run("create_user", move |conn| {
          let id = diesel::insert_into(users::table).values(UserWrite::from(&user))
                                                    .returning(users::id)
                                                    .get_result::<i64>(conn)?;
          Ok(User { id, ..user })
        })
        .await
  }

  async fn update_user(&self, user: User) -> StoreResult<User> {
    self.run("update_user", move |conn| {
          conn.immediate_transaction(|conn| {
                let existing = users::table.find(user.id)
                                           .first::<UserRow>(conn)
                                           .optional()?
                                           .ok_or_else(|| not_found("user", user.id))?;
                let row = UserWrite { created_at_ts: existing.created_at_ts, ..UserWrite::from(&user) };
                diesel::update(users::table.find(user.id)).set(&row).execute(conn)?;
                Ok(User { created_at: from_ts(existing.created_at_ts), ..user })
              })
        })
        .await
  }

  async fn delete_user(&self, id: UserId) -> StoreResult<()> {
    self.run("delete_user", move |conn| {
          conn.immediate_transaction(|conn| {
                let has_leads: bool = diesel::select(exists(leads::table.filter(leads::assigned_to.eq(id)))).get_result(conn)?;
                let has_tasks: bool = diesel::select(exists(tasks::table.filter(tasks::assigned_to.eq(id)))).get_result(conn)?;
                if has_leads || has_tasks {
                  return Err(referenced(format!("user {} has assigned leads or tasks", id)));
                }
                match diesel::delete(users::table.find(id)).execute(conn)? {
                  0 => Err(not_found("user", id)),
                  _ => Ok(()),
                }
              })
        })
        .await
  }
}

#[async_trait]
impl ContactStore for DieselCrmRepository {
  async fn get_contact(&self, id: ContactId) -> StoreResult<Option<Contact>> {
    self.run("get_contact", move |conn| {
          Ok(contacts::table.find(id).first::<ContactRow>(conn).optional()?.map(ContactRow::into_contact))
        })
        .await
  }

  async fn list_contacts(&self) -> StoreResult<Vec<Contact>> {
    self.run("list_contacts", |conn| {
          let rows = contacts::table.order(contacts::id.asc()).load::<ContactRow>(conn)?;
          Ok(rows.into_iter().map(ContactRow::into_contact).collect())
        })
        .await
  }

  async fn list_contacts_for_agent(&self, user_id: UserId) -> StoreResult<Vec<Contact>> {
    self.run("list_contacts_for_agent", move |conn| {
          let reachable = leads::table.filter(leads::assigned_to.eq(user_id)).select(leads::contact_id);
          let rows = contacts::table.filter(contacts::id.eq_any(reachable))
                                    .order(contacts::id.asc())
                                    .load::<ContactRow>(conn)?;
          Ok(rows.into_iter().map(ContactRow::into_contact).collect())
        })
        .await
  }

  async fn create_contact(&self, contact: Contact) -> StoreResult<Contact> {
    self.run("create_contact", move |conn| {
          let id = diesel::insert_into(contacts::table).values(ContactWrite::from(&contact))
                                                       .returning(contacts::id)
                                                       .get_result::<i64>(conn)?;
          Ok(Contact { id, ..contact })
        })
        .await
  }

  async fn update_contact(&self, contact: Contact) -> StoreResult<Contact> {
    self.run("update_contact", move |conn| {
          conn.immediate_transaction(|conn| {
                let existing = contacts::table.find(contact.id)
                                              .first::<ContactRow>(conn)
                                              .optional()?
                                              .ok_or_else(|| not_found("contact", contact.id))?;
                let row = ContactWrite { created_by: existing.created_by,
                                         created_at_ts: existing.created_at_ts,
                                         ..ContactWrite::from(&contact) };
                diesel::update(contacts::table.find(contact.id)).set(&row).execute(conn)?;
                Ok(Contact { created_by: existing.created_by, created_at: from_ts(existing.created_at_ts), ..contact })
              })
        })
        .await
  }

  async fn delete_contact(&self, id: ContactId) -> StoreResult<()> {
    self.run("delete_contact", move |conn| {
          conn.immediate_transaction(|conn| {
                let used: bool = diesel::select(exists(leads::table.filter(leads::contact_id.eq(id)))).get_result(conn)?;
                if used {
                  return Err(referenced(format!("contact {} is referenced by a lead", id)));
                }
                match diesel::delete(contacts::table.find(id)).execute(conn)? {
                  0 => Err(not_found("contact", id)),
                  _ => Ok(()),
                }
              })
        })
        .await
  }
}

#[async_trait]
impl PropertyStore for DieselCrmRepository {
  async fn get_property(&self, id: PropertyId) -> StoreResult<Option<Property>> {
    self.run("get_property", move |conn| load_property(conn, id)).await
  }

  async fn list_properties(&self) -> StoreResult<Vec<Property>> {
    self.run("list_properties", |conn| {
          let rows = properties::table.order(properties::id.asc()).load::<PropertyRow>(conn)?;
          rows.into_iter().map(PropertyRow::into_property).collect()
        })
        .await
  }

  async fn create_property(&self, property: Property) -> StoreResult<Property> {
    self.run("create_property", move |conn| {
          let id = diesel::insert_into(properties::table).values(PropertyWrite::from(&property))
                                                         .returning(properties::id)
                                                         .get_result::<i64>(conn)?;
          Ok(Property { id, ..property })
        })
        .await
  }

  async fn update_property(&self, property: Property) -> StoreResult<Property> {
    self.run("update_property", move |conn| {
          conn.immediate_transaction(|conn| {
                let existing = load_property(conn, property.id)?.ok_or_else(|| not_found("property", property.id))?;
                let updated = Property { created_at: existing.created_at, updated_at: Utc::now(), ..property };
                diesel::update(properties::table.find(updated.id)).set(&PropertyWrite::from(&updated)).execute(conn)?;
                Ok(updated)
              })
        })
        .await
  }

  async fn set_property_status(&self, id: PropertyId, status: PropertyStatus) -> StoreResult<()> {
    self.run("set_property_status", move |conn| {
          let n = diesel::update(properties::table.find(id)).set((properties::status.eq(status.as_str()),
                                                                   properties::updated_at_ts.eq(ts(&Utc::now()))))
                                                            .execute(conn)?;
          if n == 0 {
            return Err(not_found("property", id));
          }
          Ok(())
        })
        .await
  }

  async fn delete_property(&self, id: PropertyId) -> StoreResult<()> {
    self.run("delete_property", move |conn| {
          conn.immediate_transaction(|conn| {
                let by_lead: bool =
                  diesel::select(exists(leads::table.filter(leads::property_id.eq(id)))).get_result(conn)?;
                let by_deal: bool =
                  diesel::select(exists(deals::table.filter(deals::property_id.eq(id)))).get_result(conn)?;
                if by_lead || by_deal {
                  return Err(referenced(format!("property {} is referenced by a lead or deal", id)));
                }
                match diesel::delete(properties::table.find(id)).execute(conn)? {
                  0 => Err(not_found("property", id)),
                  _ => Ok(()),
                }
              })
        })
        .await
  }
}

#[async_trait]
impl LeadStore for DieselCrmRepository {
  async fn get_lead(&self, id: LeadId) -> StoreResult<Option<Lead>> {
    self.run("get_lead", move |conn| load_lead(conn, id)).await
  }

  async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
    self.run("list_leads", |conn| {
          let rows = leads::table.order(leads::id.asc()).load::<LeadRow>(conn)?;
          Ok(rows.into_iter().map(LeadRow::into_lead).collect())
        })
        .await
  }

  async fn list_leads_for_user(&self, user_id: UserId) -> StoreResult<Vec<Lead>> {
    self.run("list_leads_for_user", move |conn| {
          let rows = leads::table.filter(leads::assigned_to.eq(user_id))
                                 .order(leads::id.asc())
                                 .load::<LeadRow>(conn)?;
          Ok(rows.into_iter().map(LeadRow::into_lead).collect())
        })
        .await
  }

  /// Chequeo e inserción bajo una transacción IMMEDIATE: el bloqueo de
  /// escritura se toma antes de leer, así dos altas concurrentes no pueden
  /// pasar ambas el chequeo. Los índices únicos parciales quedan como red.
  async fn create_lead(&self, lead: Lead) -> StoreResult<Lead> {
    self.run("create_lead", move |conn| {
          conn.immediate_transaction(|conn| {
                if lead.is_open() && open_lead_for_contact(conn, lead.contact_id, 0)? {
                  return Err(PersistError::Store(StoreError::UniqueViolation(OPEN_LEAD_PER_CONTACT)));
                }
                if let Some(pid) = lead.referenced_property() {
                  if open_lead_for_property(conn, pid, 0)? || open_deal_for_property(conn, pid)? {
                    return Err(PersistError::Store(StoreError::UniqueViolation(PROPERTY_EXCLUSIVITY)));
                  }
                }
                let id = diesel::insert_into(leads::table).values(LeadWrite::from(&lead))
                                                          .returning(leads::id)
                                                          .get_result::<i64>(conn)?;
                Ok(Lead { id, property_id: lead.referenced_property(), ..lead })
              })
        })
        .await
  }

  async fn update_lead(&self, lead: Lead) -> StoreResult<Lead> {
    self.run("update_lead", move |conn| {
          conn.immediate_transaction(|conn| {
                let existing = load_lead(conn, lead.id)?.ok_or_else(|| not_found("lead", lead.id))?;
                let updated = Lead { property_id: lead.referenced_property(),
                                     created_at: existing.created_at,
                                     updated_at: Utc::now(),
                                     ..lead };
                if updated.is_open() {
                  if open_lead_for_contact(conn, updated.contact_id, updated.id)? {
                    return Err(PersistError::Store(StoreError::UniqueViolation(OPEN_LEAD_PER_CONTACT)));
                  }
                  if let Some(pid) = updated.property_id {
                    if open_lead_for_property(conn, pid, updated.id)? {
                      return Err(PersistError::Store(StoreError::UniqueViolation(PROPERTY_EXCLUSIVITY)));
                    }
                  }
                }
                diesel::update(leads::table.find(updated.id)).set(&LeadWrite::from(&updated)).execute(conn)?;
                Ok(updated)
              })
        })
        .await
  }

  async fn delete_lead(&self, id: LeadId) -> StoreResult<()> {
    self.run("delete_lead", move |conn| {
          conn.immediate_transaction(|conn| {
                let used: bool = diesel::select(exists(deals::table.filter(deals::lead_id.eq(id)))).get_result(conn)?;
                if used {
                  return Err(referenced(format!("lead {} is referenced by a deal", id)));
                }
                match diesel::delete(leads::table.find(id)).execute(conn)? {
                  0 => Err(not_found("lead", id)),
                  _ => Ok(()),
                }
              })
        })
        .await
  }

  async fn has_open_lead_for_contact(&self, contact_id: ContactId) -> StoreResult<bool> {
    self.run("has_open_lead_for_contact", move |conn| open_lead_for_contact(conn, contact_id, 0)).await
  }

  async fn has_open_lead_for_property(&self, property_id: PropertyId) -> StoreResult<bool> {
    self.run("has_open_lead_for_property", move |conn| open_lead_for_property(conn, property_id, 0)).await
  }

  async fn count_leads_by_status_for_user(&self, user_id: UserId) -> StoreResult<LeadStatusCounts> {
    self.run("count_leads_by_status_for_user", move |conn| {
          let grouped = leads::table.filter(leads::assigned_to.eq(user_id))
                                    .group_by(leads::status_id)
                                    .select((leads::status_id, count_star()))
                                    .load::<(i64, i64)>(conn)?;
          let mut counts = LeadStatusCounts::default();
          for (status_id, n) in grouped {
            if let Ok(status) = LeadStatus::from_id(status_id) {
              counts.record_many(status, n.max(0) as u64);
            }
          }
          Ok(counts)
        })
        .await
  }

  async fn source_lead_rows(&self) -> StoreResult<Vec<SourceLeadRow>> {
    self.run("source_lead_rows", |conn| {
          let joined = leads::table.inner_join(contacts::table)
                                   .inner_join(users::table)
                                   .order((leads::created_at_ts.desc(), leads::id.desc()))
                                   .select((leads::id,
                                            leads::created_at_ts,
                                            contacts::first_name,
                                            contacts::last_name,
                                            contacts::primary_phone,
                                            contacts::email,
                                            leads::source_id,
                                            users::username,
                                            leads::status_id))
                                   .load::<SourceLeadJoin>(conn)?;
          Ok(joined.into_iter().filter_map(SourceLeadJoin::into_row).collect())
        })
        .await
  }
}

#[async_trait]
impl DealStore for DieselCrmRepository {
  async fn get_deal(&self, id: DealId) -> StoreResult<Option<Deal>> {
    self.run("get_deal", move |conn| load_deal(conn, id)).await
  }

  async fn list_deals(&self) -> StoreResult<Vec<Deal>> {
    self.run("list_deals", |conn| {
          let rows = deals::table.order(deals::id.asc()).load::<DealRow>(conn)?;
          rows.into_iter().map(DealRow::into_deal).collect()
        })
        .await
  }

  async fn list_deals_for_user(&self, user_id: UserId) -> StoreResult<Vec<Deal>> {
    self.run("list_deals_for_user", move |conn| {
          let rows = deals::table.filter(deals::created_by.eq(user_id))
                                 .order(deals::id.asc())
                                 .load::<DealRow>(conn)?;
          rows.into_iter().map(DealRow::into_deal).collect()
        })
        .await
  }

  async fn create_deal(&self, deal: Deal) -> StoreResult<Deal> {
    self.run("create_deal", move |conn| {
          let id = diesel::insert_into(deals::table).values(DealWrite::from(&deal))
                                                    .returning(deals::id)
                                                    .get_result::<i64>(conn)?;
          Ok(Deal { id, ..deal })
        })
        .await
  }

  async fn update_deal(&self, deal: Deal) -> StoreResult<Deal> {
    self.run("update_deal", move |conn| {
          conn.immediate_transaction(|conn| {
                let existing = load_deal(conn, deal.id)?.ok_or_else(|| not_found("deal", deal.id))?;
                let updated = Deal { created_at: existing.created_at, updated_at: Utc::now(), ..deal };
                diesel::update(deals::table.find(updated.id)).set(&DealWrite::from(&updated)).execute(conn)?;
                Ok(updated)
              })
        })
        .await
  }

  async fn delete_deal(&self, id: DealId) -> StoreResult<()> {
    self.run("delete_deal", move |conn| match diesel::delete(deals::table.find(id)).execute(conn)? {
          0 => Err(not_found("deal", id)),
          _ => Ok(()),
        })
        .await
  }

  async fn has_open_deal_for_property(&self, property_id: PropertyId) -> StoreResult<bool> {
    self.run("has_open_deal_for_property", move |conn| open_deal_for_property(conn, property_id)).await
  }

  async fn sales_summary_for_user(&self, user_id: UserId) -> StoreResult<SalesSummary> {
    self.run("sales_summary_for_user", move |conn| {
          let amounts = deals::table.inner_join(leads::table)
                                    .filter(leads::assigned_to.eq(user_id))
                                    .filter(deals::deal_status.eq(DealStatus::ClosedWon.as_str()))
                                    .select(deals::deal_amount)
                                    .load::<f64>(conn)?;
          let mut summary = SalesSummary::default();
          for amount in amounts {
            summary.record(amount);
          }
          Ok(summary)
        })
        .await
  }

  async fn sales_by_source(&self) -> StoreResult<Vec<SourceSalesRow>> {
    self.run("sales_by_source", |conn| {
          let grouped = deals::table.inner_join(leads::table)
                                    .filter(deals::deal_status.eq(DealStatus::ClosedWon.as_str()))
                                    .group_by(leads::source_id)
                                    .select((leads::source_id, count_star(), sum(deals::deal_amount)))
                                    .load::<(i64, i64, Option<f64>)>(conn)?;
          let mut rows: Vec<SourceSalesRow> =
            grouped.into_iter()
                   .map(|(source_id, n, total)| SourceSalesRow { source_id,
                                                                 sales: SalesSummary { number_of_sales: n.max(0) as u64,
                                                                                       total_sales_amount:
                                                                                         total.unwrap_or(0.0) } })
                   .collect();
          rows.sort_by(|a, b| {
                b.sales
                 .total_sales_amount
                 .total_cmp(&a.sales.total_sales_amount)
                 .then(a.source_id.cmp(&b.source_id))
              });
          Ok(rows)
        })
        .await
  }

  async fn deal_pipeline(&self, created_by: Option<UserId>) -> StoreResult<Vec<PipelineStageRow>> {
    self.run("deal_pipeline", move |conn| {
          let grouped = match created_by {
            Some(user_id) => deals::table.filter(deals::created_by.eq(user_id))
                                         .group_by(deals::deal_status)
                                         .select((deals::deal_status, count_star(), sum(deals::deal_amount)))
                                         .load::<(String, i64, Option<f64>)>(conn)?,
            None => deals::table.group_by(deals::deal_status)
                                .select((deals::deal_status, count_star(), sum(deals::deal_amount)))
                                .load::<(String, i64, Option<f64>)>(conn)?,
          };
          let mut rows: Vec<PipelineStageRow> = DealStatus::ALL.into_iter().map(PipelineStageRow::empty).collect();
          for (status, n, total) in grouped {
            let stage = status.parse::<DealStatus>().map_err(|e| corrupt(e.to_string()))?;
            if let Some(row) = rows.iter_mut().find(|r| r.stage == stage) {
              row.deal_count = n.max(0) as u64;
              row.total_amount = total.unwrap_or(0.0);
            }
          }
          Ok(rows)
        })
        .await
  }
}

#[async_trait]
impl TaskStore for DieselCrmRepository {
  async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
    self.run("get_task", move |conn| Ok(tasks::table.find(id).first::<TaskRow>(conn).optional()?.map(TaskRow::into_task)))
        .await
  }

  async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
    self.run("list_tasks", |conn| {
          let rows = tasks::table.order(tasks::id.asc()).load::<TaskRow>(conn)?;
          Ok(rows.into_iter().map(TaskRow::into_task).collect())
        })
        .await
  }

  async fn list_tasks_for_user(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
    self.run("list_tasks_for_user", move |conn| {
          let rows = tasks::table.filter(tasks::assigned_to.eq(user_id))
                                 .order(tasks::id.asc())
                                 .load::<TaskRow>(conn)?;
          Ok(rows.into_iter().map(TaskRow::into_task).collect())
        })
        .await
  }

  async fn create_task(&self, task: Task) -> StoreResult<Task> {
    self.run("create_task", move |conn| {
          let id = diesel::insert_into(tasks::table).values(TaskWrite::from(&task))
                                                    .returning(tasks::id)
                                                    .get_result::<i64>(conn)?;
          Ok(Task { id, ..task })
        })
        .await
  }

  async fn update_task(&self, task: Task) -> StoreResult<Task> {
    self.run("update_task", move |conn| {
          conn.immediate_transaction(|conn| {
                let existing = tasks::table.find(task.id)
                                           .first::<TaskRow>(conn)
                                           .optional()?
                                           .ok_or_else(|| not_found("task", task.id))?;
                let updated = Task { created_at: from_ts(existing.created_at_ts), updated_at: Utc::now(), ..task };
                diesel::update(tasks::table.find(updated.id)).set(&TaskWrite::from(&updated)).execute(conn)?;
                Ok(updated)
              })
        })
        .await
  }

  async fn delete_task(&self, id: TaskId) -> StoreResult<()> {
    self.run("delete_task", move |conn| match diesel::delete(tasks::table.find(id)).execute(conn)? {
          0 => Err(not_found("task", id)),
          _ => Ok(()),
        })
        .await
  }
}
