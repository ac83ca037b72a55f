//! Persistencia Diesel/SQLite de los stores del CRM.
//! Expone el módulo `schema` y reexporta el repositorio que implementa todos
//! los traits de `crm-domain`. Las migraciones van embebidas y se aplican al
//! abrir la base.

mod diesel_repository;
pub mod schema;

pub use diesel_repository::{DieselCrmRepository, MIGRATIONS};

