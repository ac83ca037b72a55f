// stubs.rs
use crate::memory::{InMemoryCrmRepository, SEED_RECEPTION_ROLE_ID, SEED_SALES_AGENT_ROLE_ID};
use crate::repository::{ContactStore, DealStore, LeadStore, PropertyStore, UserStore};
use crate::{Contact, Deal, DealStatus, Lead, LeadStatus, Property, StoreError, User};

pub struct DomainStubs;

impl DomainStubs {
  /// Crea un repositorio en memoria pre-poblado: un usuario de Recepción,
  /// tres agentes, contactos, propiedades, leads y un deal ganado.
  ///
  /// Ids resultantes: recepción = 1, agentes = 2, 3, 4 (ordenados por
  /// username igual que por id).
  pub async fn sample_repo() -> Result<InMemoryCrmRepository, StoreError> {
    let repo = InMemoryCrmRepository::new();

    let reception = repo.create_user(User::new("recepcion", "recepcion@crm.local", SEED_RECEPTION_ROLE_ID)).await?;
    let ana = repo.create_user(User::new("agent_ana", "ana@crm.local", SEED_SALES_AGENT_ROLE_ID)).await?;
    let bruno = repo.create_user(User::new("agent_bruno", "bruno@crm.local", SEED_SALES_AGENT_ROLE_ID)).await?;
    repo.create_user(User::new("agent_carla", "carla@crm.local", SEED_SALES_AGENT_ROLE_ID)).await?;

    let mut c1 = Contact::new("Lucía", "Gómez", "0991000001").with_email("lucia@mail.test");
    c1.created_by = Some(reception.id);
    let c1 = repo.create_contact(c1).await?;
    let mut c2 = Contact::new("Mateo", "Rojas", "0991000002");
    c2.created_by = Some(reception.id);
    let c2 = repo.create_contact(c2).await?;

    let p1 = repo.create_property(Property::new("Torre A - 3B", 1, 1, 120_000.0)).await?;
    let p2 = repo.create_property(Property::new("Torre B - 7A", 1, 2, 185_000.0)).await?;
    repo.create_property(Property::new("Casa Lote 12", 2, 3, 240_000.0)).await?;

    // Lead abierto con propiedad: compromete p1.
    repo.create_lead(Lead::new(c1.id, 1, LeadStatus::Contacted, ana.id).with_property(p1.id)).await?;
    // Lead convertido con deal ganado sobre p2.
    let won = repo.create_lead(Lead::new(c2.id, 2, LeadStatus::Converted, bruno.id).with_property(p2.id)).await?;
    let mut deal = Deal::new(won.id, p2.id, 1, 180_000.0).with_status(DealStatus::ClosedWon);
    deal.created_by = Some(bruno.id);
    repo.create_deal(deal).await?;
    repo.set_property_status(p2.id, crate::PropertyStatus::Sold).await?;

    Ok(repo)
  }
}
