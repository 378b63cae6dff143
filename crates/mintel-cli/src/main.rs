mod decode;
mod requests;
mod worker;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mintel-cli")]
#[command(about = "Market intelligence pipeline operations")]
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
    /// Run the research worker by hand
    Worker {
        #[command(subcommand)]
        command: worker::WorkerCommands,
    },
    /// Inspect queued and finished research requests
    Requests {
        #[command(subcommand)]
        command: requests::RequestsCommands,
    },
    /// Decode a saved model response with the lenient JSON decoder
    Decode {
        /// File holding the raw completion text; `-` reads stdin
        #[arg(default_value = "-")]
        path: String,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let fallback = std::env::var("MINTEL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        None => println!("mintel-cli: no command given; see --help"),
        Some(Commands::Decode { path }) => decode::run_decode(&path)?,
        Some(command) => run_with_database(command).await?,
    }

    Ok(())
}

async fn run_with_database(command: Commands) -> anyhow::Result<()> {
    let config = mintel_core::load_app_config()?;
    let pool_config = mintel_db::PoolConfig::from_app_config(&config);
    let pool = mintel_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            mintel_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = mintel_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Worker { command } => worker::run(command, pool, &config).await?,
        Commands::Requests { command } => requests::run(command, &pool).await?,
        Commands::Decode { path } => decode::run_decode(&path)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
