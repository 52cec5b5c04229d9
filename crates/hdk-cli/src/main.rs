use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hdk")]
#[command(about = "Kitchen order CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base first, overrides later)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Order commands (Postgres store)
    Order {
        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[command(subcommand)]
        cmd: OrderCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    /// Apply embedded SQL migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum OrderCmd {
    /// List orders, newest first
    List {
        /// ORDERED | IN_PREPARATION | READY
        #[arg(long)]
        status: Option<String>,

        /// Order date, DDMMYYYY
        #[arg(long)]
        date: Option<String>,

        /// Requester identifier
        #[arg(long = "by")]
        ordered_by: Option<String>,

        #[arg(long)]
        start_index: Option<usize>,

        #[arg(long)]
        page_length: Option<usize>,
    },

    /// Print one order as JSON
    Show {
        #[arg(long)]
        id: i64,
    },

    /// Claim the next waiting order
    Claim {
        #[arg(long)]
        preparer: String,
    },

    /// Explicit status update
    SetStatus {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        status: String,
    },

    /// Delete an order and its items
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { config_paths, cmd } => {
            let (_, cfg) = commands::load_config(&config_paths)?;
            let pool = commands::connect(&cfg).await?;
            match cmd {
                DbCmd::Status => {
                    let s = hdk_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_orders_table={} pending_orders={}",
                        s.ok, s.has_orders_table, s.pending_orders
                    );
                }
                DbCmd::Migrate => {
                    hdk_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = hdk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Order { config_paths, cmd } => {
            let (_, cfg) = commands::load_config(&config_paths)?;
            let service = commands::order_service(&cfg).await?;
            commands::order::run(&service, cmd).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
