use clap::Parser;
use quotawatch::{config, loader, server, storage};

/// Quotawatch - REST API over parliamentary expense reimbursements
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address
    #[arg(long, default_value = "0.0.0.0")]
    http_host: String,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Path to the SQLite database file (":memory:" for a throwaway store)
    #[arg(long, default_value = "quotawatch.db")]
    database: String,

    /// Base URL of the host publishing receipt PDFs
    #[arg(long, default_value = "https://www.camara.gov.br")]
    receipt_base_url: String,

    /// Timeout for outbound receipt HEAD probes, in milliseconds
    #[arg(long, default_value_t = 5000)]
    receipt_timeout_ms: u64,

    /// Page size used when the client does not ask for one
    #[arg(long, default_value_t = 100)]
    page_size: u64,

    /// Hard ceiling on client-requested page sizes
    #[arg(long, default_value_t = 1000)]
    max_page_size: u64,

    /// Run server in daemon mode (background process)
    #[arg(long)]
    daemon: bool,

    /// Import a reimbursement dataset CSV into the database and exit
    #[arg(long, value_name = "FILE")]
    import_csv: Option<std::path::PathBuf>,
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            http_host: cli.http_host.clone(),
            http_port: cli.http_port,
            database_path: cli.database.clone(),
            receipt_base_url: cli.receipt_base_url.clone(),
            receipt_timeout_ms: cli.receipt_timeout_ms,
            default_page_size: cli.page_size,
            max_page_size: cli.max_page_size,
            daemon: cli.daemon,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    println!("\nQuotawatch v{}\n", env!("CARGO_PKG_VERSION"));

    let cli_config: config::CliConfig = (&cli).into();
    let config = match config::ServerConfig::from_cli(cli_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Import mode: load the dataset and exit without serving
    if let Some(path) = cli.import_csv {
        let store = match storage::ReimbursementStore::open(&config.database_path) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("✗ Failed to open reimbursement store: {}", e);
                std::process::exit(1);
            }
        };
        match loader::import_csv(&store, &path) {
            Ok(report) => {
                println!(
                    "✓ Imported {} records ({} new, {} updated)",
                    report.inserted + report.updated,
                    report.inserted,
                    report.updated
                );
            }
            Err(e) => {
                eprintln!("✗ Import failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    server::run_with_config(config).await;
}
