use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use studyhall::server;
use studyhall_core::{db, seed};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Studyhall management API server and admin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Seed demo reference data (optionally running migrations)
    DbSeed(DbSeedArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Listen address, e.g. 0.0.0.0:3000
    #[arg(long)]
    listen: Option<String>,
}

#[derive(Args, Debug, Default)]
struct DbSeedArgs {
    /// Skip running migrations before seeding
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let pool = connect_pool().await?;
            db::run_migrations(&pool).await?;
            let listen = args
                .listen
                .or_else(|| std::env::var("STUDYHALL_LISTEN_ADDR").ok())
                .unwrap_or_else(|| "0.0.0.0:3000".to_string());
            server::serve(pool, &listen).await
        }
        Command::Migrate => {
            let pool = connect_pool().await?;
            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");
            Ok(())
        }
        Command::DbSeed(args) => {
            let pool = connect_pool().await?;
            if args.skip_migrations {
                warn!("Skipping migrations before seeding");
            } else {
                db::run_migrations(&pool).await?;
            }
            seed::run(&pool).await?;
            tracing::info!("Reference data seeded");
            Ok(())
        }
    }
}

async fn connect_pool() -> Result<db::DbPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("STUDYHALL_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .context("STUDYHALL_DATABASE_URL (or DATABASE_URL) must be set")?;
    db::connect(&database_url).await
}
