mod common;

use common::{agent, reception, seeded_service};
use crm_domain::{Deal, DealStore, Lead, LeadStatus, LeadStore};
use crm_engine::{EngineError, ErrorKind};
use std::collections::HashSet;

#[tokio::test]
async fn one_open_lead_per_contact() {
  let (_repo, service) = seeded_service().await;
  let first = service.create_lead(&reception(), Lead::new(1, 2, LeadStatus::New, 5)).await.unwrap();
  assert!(first.id > 0);

  for status in [LeadStatus::New, LeadStatus::Contacted, LeadStatus::Qualified] {
    let err = service.create_lead(&reception(), Lead::new(1, 2, status, 5)).await.unwrap_err();
    assert_eq!(err, EngineError::BusinessRule("contact already has an active lead".to_string()));
  }
}

#[tokio::test]
async fn property_held_by_open_lead_or_deal_is_committed() {
  let (repo, service) = seeded_service().await;
  service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 2).with_property(1)).await.unwrap();
  let err = service.create_lead(&reception(), Lead::new(2, 1, LeadStatus::New, 3).with_property(1)).await.unwrap_err();
  assert_eq!(err, EngineError::BusinessRule("property already committed".to_string()));

  // Deal abierto sobre la propiedad 2, sin lead abierto que la referencie.
  repo.create_deal(Deal::new(99, 2, 1, 10.0)).await.unwrap();
  assert!(service.availability().is_committed(2).await.unwrap());
  let err = service.create_lead(&reception(), Lead::new(3, 1, LeadStatus::New, 3).with_property(2)).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::BusinessRule);

  assert!(!service.availability().is_committed(3).await.unwrap());
}

#[tokio::test]
async fn first_failing_check_wins() {
  let (_repo, service) = seeded_service().await;
  service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 2).with_property(1)).await.unwrap();

  // Contacto inexistente y propiedad comprometida: gana el contacto.
  let err = service.create_lead(&reception(), Lead::new(77, 1, LeadStatus::New, 3).with_property(1)).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid contact_id".to_string()));

  let err = service.create_lead(&reception(), Lead::new(2, 1, LeadStatus::New, 404)).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid assigned_to".to_string()));

  let err = service.create_lead(&reception(), Lead::new(2, 0, LeadStatus::New, 3)).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = service.create_lead(&reception(), Lead::new(2, 1, LeadStatus::New, 3).with_property(55)).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid property_id".to_string()));
}

#[tokio::test]
async fn unknown_status_is_a_validation_error() {
  let (_repo, service) = seeded_service().await;
  let mut lead = Lead::new(1, 1, LeadStatus::New, 2);
  lead.status_id = 9;
  let err = service.create_lead(&reception(), lead).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid status_id".to_string()));
}

#[tokio::test]
async fn sales_agent_cannot_update_someone_elses_lead() {
  let (repo, service) = seeded_service().await;
  let lead = repo.create_lead(Lead::new(1, 1, LeadStatus::New, 9)).await.unwrap();
  // Payload inválido a propósito: el guard decide antes de validar.
  let garbage = Lead::new(0, 0, LeadStatus::Lost, 0);
  let err = service.update_lead(&agent(7), lead.id, garbage).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn sales_agent_cannot_create_leads() {
  let (_repo, service) = seeded_service().await;
  let err = service.create_lead(&agent(2), Lead::new(0, 0, LeadStatus::New, 0)).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn update_may_change_status_of_the_open_lead_itself() {
  let (_repo, service) = seeded_service().await;
  let lead = service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 2).with_property(1)).await.unwrap();
  let incoming = Lead { status_id: LeadStatus::Qualified.id(), ..lead.clone() };
  let updated = service.update_lead(&reception(), lead.id, incoming).await.unwrap();
  assert_eq!(updated.status_id, LeadStatus::Qualified.id());
  assert_eq!(updated.created_at, lead.created_at);
}

#[tokio::test]
async fn update_re_resolves_changed_references() {
  let (_repo, service) = seeded_service().await;
  let lead = service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 2)).await.unwrap();

  let moved = Lead { contact_id: 99, ..lead.clone() };
  let err = service.update_lead(&reception(), lead.id, moved).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid contact_id".to_string()));

  let reassigned = Lead { assigned_to: 99, ..lead.clone() };
  let err = service.update_lead(&reception(), lead.id, reassigned).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid assigned_to".to_string()));

  let missing_property = lead.clone().with_property(55);
  let err = service.update_lead(&reception(), lead.id, missing_property).await.unwrap_err();
  assert_eq!(err, EngineError::Validation("invalid property_id".to_string()));

  let stored = service.get_lead(&reception(), lead.id).await.unwrap();
  assert_eq!((stored.contact_id, stored.assigned_to, stored.property_id), (1, 2, None));
}

#[tokio::test]
async fn update_cannot_move_a_lead_onto_a_committed_property() {
  let (repo, service) = seeded_service().await;
  service.create_lead(&reception(), Lead::new(2, 1, LeadStatus::Qualified, 3).with_property(1)).await.unwrap();
  let lead = service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 2)).await.unwrap();

  let onto_leads = lead.clone().with_property(1);
  let err = service.update_lead(&reception(), lead.id, onto_leads).await.unwrap_err();
  assert_eq!(err, EngineError::BusinessRule("property already committed".to_string()));

  // Deal abierto sobre la propiedad 2 sin lead abierto que la referencie.
  repo.create_deal(Deal::new(99, 2, 1, 10.0)).await.unwrap();
  let onto_deal = lead.clone().with_property(2);
  let err = service.update_lead(&reception(), lead.id, onto_deal).await.unwrap_err();
  assert_eq!(err, EngineError::BusinessRule("property already committed".to_string()));

  let free = service.update_lead(&reception(), lead.id, lead.clone().with_property(3)).await.unwrap();
  assert_eq!(free.property_id, Some(3));
}

#[tokio::test]
async fn reopening_a_lost_lead_cannot_break_contact_uniqueness() {
  let (_repo, service) = seeded_service().await;
  let lost = service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::Lost, 2)).await.unwrap();
  service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, 3)).await.unwrap();
  let reopen = Lead { status_id: LeadStatus::New.id(), ..lost.clone() };
  let err = service.update_lead(&reception(), lost.id, reopen).await.unwrap_err();
  assert_eq!(err, EngineError::BusinessRule("contact already has an active lead".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_admit_a_single_open_lead() {
  let (repo, service) = seeded_service().await;
  let mut handles = Vec::new();
  for assignee in [2, 3, 4, 5, 2, 3, 4, 5] {
    let service = service.clone();
    handles.push(tokio::spawn(async move {
                   service.create_lead(&reception(), Lead::new(1, 1, LeadStatus::New, assignee).with_property(3)).await
                 }));
  }
  let mut ok = 0;
  for h in handles {
    match h.await.unwrap() {
      Ok(_) => ok += 1,
      Err(e) => assert_eq!(e.kind(), ErrorKind::BusinessRule),
    }
  }
  assert_eq!(ok, 1);

  let open: Vec<_> = repo.list_leads().await.unwrap().into_iter().filter(|l| l.is_open()).collect();
  let contacts: HashSet<_> = open.iter().map(|l| l.contact_id).collect();
  assert_eq!(open.len(), 1);
  assert_eq!(contacts.len(), 1);
}
