//! Audit trail command

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use payroll_business::PayrollConfig;
use payroll_core::AuditAction;
use payroll_persistence::{EventFilter, EventReader};

use super::{company_by_site, or_dash, truncate};
use crate::db;

/// Options of `payroll audit`
pub struct AuditQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub company: Option<String>,
    pub batch: Option<i64>,
    pub employee: Option<String>,
    pub actions: Option<Vec<String>>,
    pub json: bool,
}

fn parse_actions(names: &[String]) -> Result<Vec<AuditAction>> {
    names
        .iter()
        .map(|name| AuditAction::parse(name).ok_or_else(|| anyhow!("unknown audit action '{}'", name)))
        .collect()
}

/// Print audit events matching the query
pub async fn run_audit(config: &PayrollConfig, query: AuditQuery) -> Result<()> {
    let events_dir = &config.audit.events_dir;

    // Build filter
    let mut filter = EventFilter::new();
    if let Some(site) = &query.company {
        let ctx = db::open(config).await?;
        filter = filter.company(company_by_site(&ctx, site).await?.id);
    }
    if let Some(batch_id) = query.batch {
        filter = filter.batch(batch_id);
    }
    if let Some(emp_code) = &query.employee {
        filter = filter.employee(emp_code);
    }
    if let Some(names) = &query.actions {
        filter = filter.actions(parse_actions(names)?);
    }

    // Read events based on date range
    let reader = EventReader::new(events_dir);
    let events = match (&query.from, &query.to) {
        (Some(from_date), Some(to_date)) => reader.read_range(from_date, to_date)?,
        (Some(from_date), None) => {
            let today = Utc::now().format("%Y-%m-%d").to_string();
            reader.read_range(from_date, &today)?
        }
        (None, Some(to_date)) => {
            let to = NaiveDate::parse_from_str(to_date, "%Y-%m-%d")
                .with_context(|| format!("Invalid to date: {}", to_date))?;
            reader
                .read_all()?
                .into_iter()
                .filter(|e| e.timestamp.date_naive() <= to)
                .collect()
        }
        (None, None) => reader.read_all()?,
    };

    let events = filter.apply(events);

    if query.json {
        for event in &events {
            println!("{}", event.to_json()?);
        }
        return Ok(());
    }

    println!("🔍 Audit Trail");
    println!("   Events directory: {:?}", events_dir);
    if let Some(from) = &query.from {
        println!("   From: {}", from);
    }
    if let Some(to) = &query.to {
        println!("   To: {}", to);
    }
    println!();

    if events.is_empty() {
        println!("No events found matching criteria.");
        return Ok(());
    }

    println!(
        "{:<11} {:<17} {:<26} {:<10} {:<7} {:<9} {:<30}",
        "EVENT", "TIME", "ACTION", "ACTOR", "BATCH", "EMP", "DESCRIPTION"
    );
    println!("{}", "-".repeat(114));
    for event in &events {
        println!(
            "{:<11} {:<17} {:<26} {:<10} {:<7} {:<9} {:<30}",
            truncate(&event.event_id, 11),
            event.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            event.action.as_str(),
            truncate(&event.actor, 10),
            event
                .batch_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            truncate(or_dash(event.employee_code.as_deref()), 9),
            truncate(or_dash(event.description.as_deref()), 30)
        );
    }
    println!("\nTotal: {} events", events.len());

    Ok(())
}
