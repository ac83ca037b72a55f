use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{Duration, Utc};
use crm_domain::{Claims, Deal, DealStatus, DomainStubs, Lead, LeadStatus, Task};
use crm_engine::{CancellationToken, CrmService, EngineConfig, Stores};
use crm_persistence::DieselCrmRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Consola interactiva sobre el motor de reglas del CRM.
///
/// Usa SQLite cuando `database.url` (o `CRM_DB_URL`) está definido; si no,
/// arranca con un repositorio en memoria con datos de ejemplo.
///
/// Opciones soportadas:
/// 1) Cambiar de usuario
/// 2) Ver contactos / leads / deals / propiedades / tareas
/// 3) Crear lead, cambiar su estado, crear y cerrar deals, crear tareas
/// 4) Reportes por empleado, por origen, pipeline y ventas propias
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::load()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();

    let stores = match config.database.url.as_deref() {
        Some(url) => Stores::from_repository(Arc::new(DieselCrmRepository::new(url)?)),
        None => {
            info!("database.url no definido, usando datos de ejemplo en memoria");
            Stores::from_repository(Arc::new(DomainStubs::sample_repo().await?))
        }
    };
    let service = CrmService::bootstrap(stores.clone(), &config.roles).await?;

    let mut claims = match login(&stores).await? {
        Some(c) => c,
        None => return Ok(()),
    };

    loop {
        println!("\n== CRM menu (usuario {}) ==", claims.user_id);
        println!("1) Cambiar de usuario");
        println!("2) Ver contactos");
        println!("3) Ver leads");
        println!("4) Crear lead");
        println!("5) Cambiar estado de un lead");
        println!("6) Ver deals");
        println!("7) Crear deal");
        println!("8) Cerrar deal");
        println!("9) Ver propiedades");
        println!("10) Ver tareas");
        println!("11) Crear tarea");
        println!("12) Reporte de leads por empleado");
        println!("13) Reporte de ventas por empleado");
        println!("14) Mis ventas");
        println!("15) Reporte de leads por origen");
        println!("16) Reporte de ventas por origen");
        println!("17) Pipeline de deals");
        println!("18) Salir");
        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => {
                if let Some(c) = login(&stores).await? {
                    claims = c;
                }
            }
            "2" => match service.list_contacts(&claims).await {
                Ok(contacts) => {
                    println!("\nID  | NOMBRE                         | TELÉFONO");
                    for c in contacts {
                        println!("{:<3} | {:<30} | {}", c.id, c.full_name(), c.primary_phone);
                    }
                }
                Err(e) => eprintln!("Error listando contactos: {}", e),
            },
            "3" => match service.list_leads(&claims).await {
                Ok(leads) => {
                    println!("\nID  | CONTACTO | PROPIEDAD | ESTADO     | ASIGNADO");
                    for l in leads {
                        let status = l.status().map(|s| s.to_string()).unwrap_or_else(|_| l.status_id.to_string());
                        let pid = l.property_id.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
                        println!("{:<3} | {:<8} | {:<9} | {:<10} | {}", l.id, l.contact_id, pid, status, l.assigned_to);
                    }
                }
                Err(e) => eprintln!("Error listando leads: {}", e),
            },
            "4" => {
                let Some(contact_id) = read_id("Contact id: ")? else { continue };
                let Some(assigned_to) = read_id("Asignado a (user id): ")? else { continue };
                let Some(source_id) = read_id("Source id: ")? else { continue };
                let Some(status) = read_status()? else { continue };
                let property = prompt("Property id (enter para ninguno): ")?;
                let mut lead = Lead::new(contact_id, source_id, status, assigned_to);
                if let Ok(pid) = property.trim().parse::<i64>() {
                    lead = lead.with_property(pid);
                }
                match service.create_lead(&claims, lead).await {
                    Ok(l) => println!("Lead creado: {}", l.id),
                    Err(e) => eprintln!("Error creando lead: {}", e),
                }
            }
            "5" => {
                let Some(id) = read_id("Lead id: ")? else { continue };
                let Some(status) = read_status()? else { continue };
                let existing = match service.get_lead(&claims, id).await {
                    Ok(l) => l,
                    Err(e) => { eprintln!("No se pudo leer el lead: {}", e); continue; }
                };
                let incoming = Lead { status_id: status.id(), ..existing };
                match service.update_lead(&claims, id, incoming).await {
                    Ok(l) => println!("Lead {} ahora está en {}", l.id, status),
                    Err(e) => eprintln!("Error actualizando lead: {}", e),
                }
            }
            "6" => match service.list_deals(&claims).await {
                Ok(deals) => {
                    println!("\nID  | LEAD | PROPIEDAD | ESTADO      | MONTO");
                    for d in deals {
                        println!("{:<3} | {:<4} | {:<9} | {:<11} | {:.2}", d.id, d.lead_id, d.property_id, d.deal_status.as_str(), d.deal_amount);
                    }
                }
                Err(e) => eprintln!("Error listando deals: {}", e),
            },
            "7" => {
                let Some(lead_id) = read_id("Lead id: ")? else { continue };
                let Some(property_id) = read_id("Property id: ")? else { continue };
                let amount = prompt("Monto: ")?;
                let amount: f64 = match amount.trim().parse() {
                    Ok(a) => a,
                    Err(_) => { eprintln!("Monto inválido"); continue; }
                };
                match service.create_deal(&claims, Deal::new(lead_id, property_id, 1, amount)).await {
                    Ok(outcome) => println!("Deal creado: {}", outcome.deal.id),
                    Err(e) => eprintln!("Error creando deal: {}", e),
                }
            }
            "8" => {
                let Some(id) = read_id("Deal id: ")? else { continue };
                let won = prompt("¿Ganado? escribir 'yes' para Closed-Won: ")?;
                let status = if won.trim().eq_ignore_ascii_case("yes") { DealStatus::ClosedWon } else { DealStatus::ClosedLost };
                let existing = match service.get_deal(&claims, id).await {
                    Ok(d) => d,
                    Err(e) => { eprintln!("No se pudo leer el deal: {}", e); continue; }
                };
                match service.update_deal(&claims, id, existing.with_status(status)).await {
                    Ok(outcome) if outcome.is_degraded() => {
                        println!("Deal {} cerrado, pero hubo efectos no aplicados:", outcome.deal.id);
                        for effect in outcome.side_effects {
                            println!("  {:?}", effect);
                        }
                    }
                    Ok(outcome) => println!("Deal {} cerrado como {}", outcome.deal.id, outcome.deal.deal_status),
                    Err(e) => eprintln!("Error cerrando deal: {}", e),
                }
            }
            "9" => match service.list_properties(&claims).await {
                Ok(properties) => {
                    println!("\nID  | NOMBRE                         | ESTADO    | PRECIO");
                    for p in properties {
                        println!("{:<3} | {:<30} | {:<9} | {:.2}", p.id, p.name, p.status.as_str(), p.price);
                    }
                }
                Err(e) => eprintln!("Error listando propiedades: {}", e),
            },
            "10" => match service.list_tasks(&claims).await {
                Ok(tasks) => {
                    println!("\nID  | TAREA                          | ESTADO    | VENCE");
                    for t in tasks {
                        println!("{:<3} | {:<30} | {:<9} | {}", t.id, t.task_name, t.status, t.due_date.format("%Y-%m-%d"));
                    }
                }
                Err(e) => eprintln!("Error listando tareas: {}", e),
            },
            "11" => {
                let name = prompt("Nombre de la tarea: ")?;
                let Some(assigned_to) = read_id("Asignada a (user id): ")? else { continue };
                let days = prompt("Vence en (días, enter = 7): ")?;
                let days = days.trim().parse::<i64>().unwrap_or(7);
                let task = Task::new(name.trim(), Utc::now() + Duration::days(days), assigned_to);
                match service.create_task(&claims, task).await {
                    Ok(t) => println!("Tarea creada: {}", t.id),
                    Err(e) => eprintln!("Error creando tarea: {}", e),
                }
            }
            "12" => {
                let cancel = cancel_on_ctrl_c();
                match service.employee_lead_report(&claims, &cancel).await {
                    Ok(report) => {
                        println!("\nEMPLEADO             | NEW | CONT | QUAL | CONV | LOST");
                        for r in &report.rows {
                            let c = r.counts;
                            println!("{:<20} | {:<3} | {:<4} | {:<4} | {:<4} | {}",
                                     r.employee_name, c.new, c.contacted, c.qualified, c.converted, c.lost);
                        }
                        let t = report.total;
                        println!("{:<20} | {:<3} | {:<4} | {:<4} | {:<4} | {}",
                                 "TOTAL", t.new, t.contacted, t.qualified, t.converted, t.lost);
                    }
                    Err(e) => eprintln!("Error generando reporte: {}", e),
                }
                cancel.cancel();
            }
            "13" => {
                let cancel = cancel_on_ctrl_c();
                match service.employee_sales_report(&claims, &cancel).await {
                    Ok(report) => match serde_json::to_string_pretty(&report) {
                        Ok(json) => println!("{}", json),
                        Err(e) => eprintln!("Error serializando reporte: {}", e),
                    },
                    Err(e) => eprintln!("Error generando reporte: {}", e),
                }
                cancel.cancel();
            }
            "14" => match service.my_sales_report(&claims).await {
                Ok(row) => println!("{}: {} ventas por {:.2}", row.employee_name, row.sales.number_of_sales, row.sales.total_sales_amount),
                Err(e) => eprintln!("Error generando reporte: {}", e),
            },
            "15" => match service.source_lead_report(&claims).await {
                Ok(rows) => {
                    println!("\nFECHA      | CONTACTO                       | ORIGEN | ASIGNADO             | ESTADO");
                    for r in rows {
                        println!("{} | {:<30} | {:<6} | {:<20} | {}",
                                 r.lead_date.format("%Y-%m-%d"), r.contact_name, r.source_id, r.assigned_employee, r.lead_status);
                    }
                }
                Err(e) => eprintln!("Error generando reporte: {}", e),
            },
            "16" => match service.source_sales_report(&claims).await {
                Ok(report) => {
                    println!("\nORIGEN | VENTAS | MONTO");
                    for r in &report.rows {
                        println!("{:<6} | {:<6} | {:.2}", r.source_id, r.sales.number_of_sales, r.sales.total_sales_amount);
                    }
                    println!("{:<6} | {:<6} | {:.2}", "TOTAL", report.total.number_of_sales, report.total.total_sales_amount);
                }
                Err(e) => eprintln!("Error generando reporte: {}", e),
            },
            "17" => match service.deals_pipeline_report(&claims).await {
                Ok(report) => {
                    println!("\nETAPA       | DEALS | MONTO");
                    for r in &report.rows {
                        println!("{:<11} | {:<5} | {:.2}", r.stage.as_str(), r.deal_count, r.total_amount);
                    }
                    println!("{:<11} | {:<5} | {:.2}", "TOTAL", report.total.total_deal_count, report.total.total_deal_amount);
                }
                Err(e) => eprintln!("Error generando reporte: {}", e),
            },
            "18" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

/// Pide un user id y arma las claims a partir del usuario guardado.
async fn login(stores: &Stores) -> Result<Option<Claims>, Box<dyn Error>> {
    loop {
        let raw = prompt("User id (enter para salir): ")?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let Ok(id) = raw.trim().parse::<i64>() else {
            eprintln!("Id inválido");
            continue;
        };
        match stores.users.get_user(id).await? {
            Some(u) => {
                println!("Sesión iniciada como {}", u.username);
                return Ok(Some(Claims::new(u.id, u.role_id)));
            }
            None => eprintln!("Usuario {} no existe", id),
        }
    }
}

/// Token que se cancela con Ctrl+C; el llamador lo cancela al terminar para
/// liberar la tarea de escucha.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => token.cancel(),
            _ = token.cancelled() => {}
        }
    });
    cancel
}

fn read_id(msg: &str) -> io::Result<Option<i64>> {
    let raw = prompt(msg)?;
    match raw.trim().parse::<i64>() {
        Ok(n) => Ok(Some(n)),
        Err(_) => {
            eprintln!("Id inválido");
            Ok(None)
        }
    }
}

fn read_status() -> io::Result<Option<LeadStatus>> {
    let raw = prompt("Estado (1=New 2=Contacted 3=Qualified 4=Converted 5=Lost): ")?;
    match raw.trim().parse::<i64>().ok().and_then(|n| LeadStatus::from_id(n).ok()) {
        Some(s) => Ok(Some(s)),
        None => {
            eprintln!("Estado inválido");
            Ok(None)
        }
    }
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
