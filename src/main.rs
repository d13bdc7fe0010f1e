//! HealthEnforcer
//!
//! An MCP server exposing the calorie-tracking assistant's tools.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use healthenforcer::build_info;
use healthenforcer::config::Config;
use healthenforcer::db::{migrations, Database};
use healthenforcer::mcp::HealthEnforcerService;
use healthenforcer::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("healthenforcer=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env();
    eprintln!("Database path: {}", config.database_path.display());
    info!(
        min_daily_limit = config.limits.min_daily_limit,
        default_daily_goal = config.limits.default_daily_goal,
        "limit policy loaded"
    );

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        let version = migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let service = HealthEnforcerService::new(
        config.database_path.clone(),
        SqliteStore::new(database),
        config.limits,
    );

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
