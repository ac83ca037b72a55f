mod common;

use chrono::{Duration, Utc};
use common::{agent, reception, seeded_service};
use crm_domain::{Claims, Contact, Lead, LeadStatus, Property, PropertyStatus, Task};
use crm_engine::{CrmService, EngineError, ErrorKind, RolesConfig};

#[tokio::test]
async fn agents_see_only_their_own_leads_and_contacts() {
  let (_repo, service) = seeded_service().await;
  service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 2)).await.unwrap();
  let other = service.create_lead(&reception(), Lead::new(2, 1, LeadStatus::New, 3)).await.unwrap();

  let mine = service.list_leads(&agent(2)).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].assigned_to, 2);
  assert_eq!(service.list_leads(&reception()).await.unwrap().len(), 2);

  assert_eq!(service.get_lead(&agent(2), other.id).await.unwrap_err().kind(), ErrorKind::Forbidden);
  assert_eq!(service.get_lead(&agent(3), other.id).await.unwrap().id, other.id);

  let contacts = service.list_contacts(&agent(2)).await.unwrap();
  assert_eq!(contacts.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1]);
  assert!(service.get_contact(&agent(2), 1).await.is_ok());
  assert_eq!(service.get_contact(&agent(2), 2).await.unwrap_err().kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn contact_without_leads_or_creator_is_readable_by_agents() {
  let (_repo, service) = seeded_service().await;
  assert_eq!(service.get_contact(&agent(2), 3).await.unwrap().id, 3);

  let registered = service.create_contact(&reception(), Contact::new("Ana", "Vera", "0999")).await.unwrap();
  let err = service.get_contact(&agent(2), registered.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  service.create_lead(&reception(), Lead::new(registered.id, 1, LeadStatus::New, 2)).await.unwrap();
  assert!(service.get_contact(&agent(2), registered.id).await.is_ok());
  assert_eq!(service.get_contact(&agent(3), registered.id).await.unwrap_err().kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn contact_updates_keep_the_creator() {
  let (_repo, service) = seeded_service().await;
  let c = service.create_contact(&reception(), Contact::new("Ana", "Vera", "0999")).await.unwrap();
  let moved = Contact { primary_phone: "0888".to_string(), created_by: Some(4), ..c.clone() };
  let updated = service.update_contact(&reception(), moved).await.unwrap();
  assert_eq!(updated.primary_phone, "0888");
  assert_eq!(updated.created_by, Some(1));
  assert_eq!(service.get_contact(&reception(), c.id).await.unwrap().primary_phone, "0888");
  let err = service.update_contact(&agent(2), updated).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn contact_creation_records_the_actor() {
  let (_repo, service) = seeded_service().await;
  let c = service.create_contact(&reception(), Contact::new("Ana", "Vera", "0999")).await.unwrap();
  assert_eq!(c.created_by, Some(1));
  let err = service.create_contact(&reception(), Contact::new("", "Vera", "0999")).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("first_name is required".to_string()));
  let err = service.create_contact(&agent(2), Contact::new("Ana", "Vera", "0999")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn new_properties_start_available_and_status_is_not_editable() {
  let (_repo, service) = seeded_service().await;
  let mut p = Property::new("Casa 9", 2, 1, 50_000.0);
  p.status = PropertyStatus::Sold;
  let created = service.create_property(&reception(), p).await.unwrap();
  assert_eq!(created.status, PropertyStatus::Available);

  let repriced = Property { price: 55_000.0, ..created.clone() };
  assert_eq!(service.update_property(&reception(), repriced).await.unwrap().price, 55_000.0);

  let sold = Property { status: PropertyStatus::Sold, ..created.clone() };
  let err = service.update_property(&reception(), sold).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  // Catálogo visible para agentes, pero no editable.
  assert!(service.get_property(&agent(2), created.id).await.is_ok());
  let err = service.update_property(&agent(2), created.clone()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn referenced_rows_refuse_deletion() {
  let (_repo, service) = seeded_service().await;
  service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 2).with_property(1)).await.unwrap();
  let err = service.delete_contact(&reception(), 1).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::BusinessRule);
  let err = service.delete_property(&reception(), 1).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::BusinessRule);
  service.delete_contact(&reception(), 3).await.unwrap();
  let err = service.delete_contact(&reception(), 3).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn tasks_are_owner_scoped() {
  let (_repo, service) = seeded_service().await;
  let task = service.create_task(&reception(), Task::new("Llamar a Lucía", Utc::now(), 2)).await.unwrap();

  let done = Task { status: "Done".to_string(), ..task.clone() };
  assert_eq!(service.update_task(&agent(2), task.id, done.clone()).await.unwrap().status, "Done");
  assert_eq!(service.update_task(&agent(3), task.id, done).await.unwrap_err().kind(), ErrorKind::Forbidden);

  let handed_off = Task { assigned_to: 3, ..task.clone() };
  assert_eq!(service.update_task(&agent(2), task.id, handed_off).await.unwrap_err().kind(), ErrorKind::Forbidden);
  assert_eq!(service.list_tasks(&agent(3)).await.unwrap().len(), 0);
  assert_eq!(service.delete_task(&agent(2), task.id).await.unwrap_err().kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn task_needs_a_real_assignee_and_a_future_due_date() {
  let (_repo, service) = seeded_service().await;
  let err = service.create_task(&reception(), Task::new("Visita", Utc::now() + Duration::days(1), 99)).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid assigned_to".to_string()));

  let err = service.create_task(&reception(), Task::new("Visita", Utc::now() - Duration::days(2), 3)).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("due date cannot be in the past".to_string()));

  let mut blank = Task::new("Visita", Utc::now() + Duration::days(1), 3);
  blank.status = String::new();
  let created = service.create_task(&reception(), blank).await.unwrap();
  assert_eq!(created.status, "Pending");
  assert!(service.list_tasks(&reception()).await.unwrap().iter().all(|t| t.assigned_to == 3));
}

#[tokio::test]
async fn unknown_roles_and_user_reads() {
  let (_repo, service) = seeded_service().await;
  let stranger = Claims::new(2, 77);
  assert_eq!(service.list_properties(&stranger).await.unwrap_err().kind(), ErrorKind::Forbidden);
  assert_eq!(service.list_users(&agent(2)).await.unwrap_err().kind(), ErrorKind::Forbidden);
  let users = service.list_users(&reception()).await.unwrap();
  assert_eq!(users.len(), 5);
  assert_eq!(service.get_user(&reception(), 40).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn bootstrap_resolves_roles_from_the_store() {
  let repo = std::sync::Arc::new(crm_domain::DomainStubs::sample_repo().await.unwrap());
  let service = CrmService::from_repository(repo, &RolesConfig::default()).await.unwrap();
  assert_eq!(service.roles().reception_id, crm_domain::SEED_RECEPTION_ROLE_ID);
  let bad = RolesConfig { reception: "Gerencia".to_string(), ..RolesConfig::default() };
  let repo = std::sync::Arc::new(crm_domain::InMemoryCrmRepository::new());
  let err = CrmService::from_repository(repo, &bad).await.err().unwrap();
  assert_eq!(err.kind(), ErrorKind::Config);
}
