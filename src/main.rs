use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use procure_agent::agents::receipt_parser::ReceiptParserInput;
use procure_agent::agents::supplier_search::SupplierSearchInput;
use procure_agent::agents::{Agent, AgentMode};
use procure_agent::api::state::AppState;
use procure_agent::config::{AppConfig, ConfigSource};
use procure_agent::extract::{self, validate, Shape};
use procure_agent::models::{MarketData, SupplierInfo};
use procure_agent::{document, parse_duration};

#[derive(Parser)]
#[command(name = "procure-agent")]
#[command(about = "Procurement assistant: receipt parsing, supplier search and email drafting")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Override the agent mode (demo or live)
    #[arg(long)]
    mode: Option<AgentMode>,

    /// Override the AI request timeout (e.g., "30s", "2m")
    #[arg(long)]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Parse a receipt file and print the expenses
    ParseReceipt {
        /// PDF or text receipt
        path: PathBuf,
    },

    /// Search for alternative suppliers
    Search {
        /// Expense category (material, printing, shipping)
        category: String,

        #[arg(long, default_value = "San Francisco")]
        city: String,

        /// Price paid today, per unit
        #[arg(long)]
        current_price: f64,
    },

    /// Draft an email to a supplier
    DraftEmail {
        #[arg(long)]
        business_name: String,

        #[arg(long, default_value = "")]
        contact_email: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        current_price: f64,

        /// Write a negotiation email to the current supplier
        #[arg(long)]
        negotiate: bool,

        /// Market average; searched for when omitted
        #[arg(long, requires = "negotiate")]
        average_price: Option<f64>,

        /// Lowest competitor price; searched for when omitted
        #[arg(long, requires = "negotiate")]
        lowest_price: Option<f64>,

        /// City used when market data has to be searched for
        #[arg(long, default_value = "San Francisco")]
        city: String,
    },

    /// Run the JSON extractor on raw model output (file or "-" for stdin)
    Extract {
        /// receipt, alternatives or email_draft
        shape: Shape,

        #[arg(default_value = "-")]
        input: String,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<(AppConfig, ConfigSource)> {
    let (mut config, source) = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(timeout) = &cli.timeout {
        let Some(duration) = parse_duration(timeout) else {
            bail!("Invalid --timeout: {}", timeout);
        };
        config.ai.timeout_seconds = duration.as_secs();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Commands::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    config.validate()?;
    Ok((config, source))
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, source) = load_config(&cli)?;

    init_tracing(&config.log_level, cli.json_logs);

    tracing::info!("Starting procure-agent v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Configuration from {}", source);

    // The extractor needs no backend
    if let Commands::Extract { shape, input } = &cli.command {
        let raw = read_input(input)?;
        let value = extract::extract_or_default(&raw, *shape);
        if !validate::is_valid(&value, *shape) {
            tracing::warn!("Extracted {} does not match the expected schema", shape);
        }
        return print_json(&value);
    }

    tracing::info!("Agent mode: {}", config.mode);
    let state = AppState::from_config(&config)?;

    match cli.command {
        Commands::Serve { .. } => {
            let app = procure_agent::api::build_router(state);
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::ParseReceipt { path } => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string());
            let text = document::receipt_text(&bytes, None, file_name.as_deref())?;

            let output = state
                .receipt_parser
                .execute(ReceiptParserInput { text, file_name })
                .await;
            if output.is_fallback() {
                tracing::warn!("Using fallback receipt: {:?}", output.notes);
            }
            print_json(&output.data)?;
        }
        Commands::Search {
            category,
            city,
            current_price,
        } => {
            let output = state
                .supplier_search
                .execute(SupplierSearchInput {
                    category,
                    city,
                    current_price,
                })
                .await;
            print_json(&output.data)?;
        }
        Commands::DraftEmail {
            business_name,
            contact_email,
            category,
            current_price,
            negotiate,
            average_price,
            lowest_price,
            city,
        } => {
            let supplier = SupplierInfo {
                business_name,
                contact_email,
            };

            let output = if negotiate {
                let market_data = match (average_price, lowest_price) {
                    (Some(average), Some(lowest)) => MarketData {
                        average_market_price: average,
                        lowest_competitor_price: lowest,
                        highest_competitor_price: None,
                        extra: Default::default(),
                    },
                    _ => {
                        let found = state
                            .supplier_search
                            .execute(SupplierSearchInput {
                                category: category.clone(),
                                city,
                                current_price,
                            })
                            .await;
                        let Some(data) = MarketData::from_alternatives(&found.data.alternatives)
                        else {
                            bail!("No alternatives found for {}; pass --average-price and --lowest-price", category);
                        };
                        data
                    }
                };
                state
                    .negotiator
                    .draft_negotiation_email(supplier, &category, current_price, market_data)
                    .await
            } else {
                state
                    .negotiator
                    .draft_new_supplier_email(supplier, &category, current_price)
                    .await
            };

            if output.is_fallback() {
                tracing::warn!("Email draft fell back: {:?}", output.notes);
            }
            print_json(&output.data)?;
        }
        Commands::Extract { .. } => {}
    }

    Ok(())
}
