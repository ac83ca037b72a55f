// ids.rs
// Identificadores numéricos tal como los asigna el store (secuencias).
pub type UserId = i64;
pub type RoleId = i64;
pub type ContactId = i64;
pub type PropertyId = i64;
pub type LeadId = i64;
pub type DealId = i64;
pub type TaskId = i64;
pub type SourceId = i64;
pub type StageId = i64;
