mod config;
mod http;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{OnboardingService, ResetRequest, roster};
use serde_json::json;
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "onboarding-server", version, about = "Employee onboarding service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Create employees from a local CSV roster and print the result.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Issue a fresh one-time password for an employee.
    ResetPassword {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env()?)?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, Arc::new(AppConfig::load()?)).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Import { file } => import_roster(file).await,
        Command::ResetPassword { name, id } => reset_password(name, id).await,
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env()?;
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let state = AppState {
        onboarding: OnboardingService::new(pool.clone()),
        config,
    };
    http::serve(cmd.into(), state).await?;
    platform_db::close(pool).await?;
    Ok(())
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `onboarding-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    platform_db::close(pool).await?;
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    platform_db::close(pool).await?;
    Ok(())
}

async fn import_roster(file: PathBuf) -> Result<()> {
    roster::ensure_csv_filename(&file.to_string_lossy())?;
    let contents = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let pool = setup_pool().await?;
    let result = OnboardingService::new(pool.clone())
        .bulk_create(&contents)
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    platform_db::close(pool).await?;
    Ok(())
}

async fn reset_password(name: String, id: i64) -> Result<()> {
    let pool = setup_pool().await?;
    let result = OnboardingService::new(pool.clone())
        .reset_password(ResetRequest {
            name,
            employee_id: id,
        })
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "message": "Password reset successfully.",
            "result": result,
        }))?
    );
    platform_db::close(pool).await?;
    Ok(())
}
