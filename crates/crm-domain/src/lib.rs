mod contact;
mod deal;
mod errors;
pub mod ids;
mod lead;
mod memory;
mod property;
mod report;
mod repository;
mod role;
mod stubs;
mod task;
mod user;

pub use contact::Contact;
pub use deal::{Deal, DealStatus, SalesSummary};
pub use errors::{DomainError, StoreError, OPEN_LEAD_PER_CONTACT, PROPERTY_EXCLUSIVITY};
pub use lead::{Lead, LeadStatus, LeadStatusCounts};
pub use memory::{InMemoryCrmRepository, SEED_RECEPTION_ROLE_ID, SEED_SALES_AGENT_ROLE_ID};
pub use property::{Property, PropertyStatus};
pub use report::{DealsPipelineReport, EmployeeLeadReport, EmployeeLeadRow, EmployeeSalesReport, EmployeeSalesRow, PipelineStageRow,
                 PipelineTotal, SourceLeadRow, SourceSalesReport, SourceSalesRow};
pub use repository::{ContactStore, CrmRepository, DealStore, LeadStore, PropertyStore, RoleDirectory, StoreResult, TaskStore,
                     UserStore};
pub use role::{Claims, Role, RECEPTION_ROLE_NAME, SALES_AGENT_ROLE_NAME};
pub use stubs::DomainStubs;
pub use task::{Task, DEFAULT_TASK_STATUS};
pub use user::User;
