//! Database initialization and status

use anyhow::{Context, Result};
use payroll_business::{PayrollConfig, ServiceContext};
use payroll_persistence::Database;

/// Initialize the database with schema
pub async fn init_database(config: &PayrollConfig, force: bool) -> Result<()> {
    let db_path = &config.database.path;
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    println!("📦 Applying migrations...");
    let db = Database::init_with_migrations(&config.database_url(), &config.audit.events_dir)
        .await
        .context("Failed to initialize database")?;
    db.pool().close().await;
    Ok(())
}

/// Show database status
pub async fn show_status(config: &PayrollConfig) -> Result<()> {
    let db_path = &config.database.path;
    if !db_path.exists() {
        println!("❌ Database not found at {:?}", db_path);
        println!("   Run 'payroll init' to create the database");
        return Ok(());
    }

    let db = Database::new(&config.database_url(), &config.audit.events_dir).await?;
    let pool = db.pool();

    println!("📊 Database Status");
    println!("   Path:   {:?}", db_path);
    println!("   Events: {:?}", config.audit.events_dir);
    println!();

    let tables = [
        ("Companies", "companies"),
        ("Employees", "employees"),
        ("Bank accounts", "bank_accounts"),
        ("Bank changes", "bank_change_requests"),
        ("Profile changes", "profile_change_requests"),
        ("Batches", "salary_batches"),
        ("Transactions", "salary_transactions"),
        ("Reversals", "salary_batch_reversals"),
    ];
    for (label, table) in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap_or((0,));
        println!("   {:<16} {}", format!("{}:", label), count.0);
    }

    pool.close().await;
    Ok(())
}

/// Open the database and build a service context
pub async fn open(config: &PayrollConfig) -> Result<ServiceContext> {
    if !config.database.path.exists() {
        anyhow::bail!(
            "Database not found at {:?}. Run 'payroll init' first.",
            config.database.path
        );
    }
    let db = Database::new(&config.database_url(), &config.audit.events_dir)
        .await
        .context("Failed to connect to database")?;
    Ok(ServiceContext::new(&db, config.payroll.clone()))
}
