mod catalog;
mod users;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::catalog::CatalogCommands;
use crate::users::UsersCommands;

#[derive(Debug, Parser)]
#[command(name = "storefront-cli")]
#[command(about = "Storefront catalog and review administration")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage API users and their bearer tokens
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Inspect and repair product rating data
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
    /// Insert products from a YAML catalog file
    Seed {
        /// Email of the admin user who will own the seeded products
        #[arg(long)]
        owner_email: String,
        /// Catalog file to read (defaults to `STOREFRONT_CATALOG_PATH`)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("storefront-cli: no command given; see --help");
        return Ok(());
    };

    let config = storefront_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = storefront_db::PoolConfig::from_app_config(&config);
    let pool = storefront_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Migrate => {
                let applied = storefront_db::run_migrations(&pool).await?;
                println!("migrations applied: {applied}");
            }
            DbCommands::Ping => {
                storefront_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::Seed { owner_email, path } => {
                let path = path.unwrap_or_else(|| config.catalog_path.clone());
                catalog::run_seed(&pool, &owner_email, &path).await?;
            }
        },
        Commands::Users { command } => match command {
            UsersCommands::Create { name, email, admin } => {
                users::run_create(&pool, &config, &name, &email, admin).await?;
            }
            UsersCommands::RotateToken { email } => {
                users::run_rotate_token(&pool, &config, &email).await?;
            }
        },
        Commands::Catalog { command } => match command {
            CatalogCommands::Reconcile => catalog::run_reconcile(&pool).await?,
            CatalogCommands::Status => catalog::run_status(&pool).await?,
        },
    }

    Ok(())
}
