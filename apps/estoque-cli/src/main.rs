//! # estoque
//!
//! Command-line front end for the Estoque Inteligente client.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  estoque cep 01310-100                 look up an address               │
//! │  estoque export --format pdf ...       export a JSON row file           │
//! │  estoque dashboard [--products f]      dashboard cards                  │
//! │  estoque low-stock --input f           products at or below minimum     │
//! │  estoque language [code]               show / set UI language           │
//! │  estoque theme [light|dark]            show / set theme                 │
//! │  estoque sidebar [open|closed]         show / set sidebar state         │
//! │  estoque guard <path> [--admin]        evaluate the route guard         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use estoque_client::export::DirectorySink;
use estoque_client::{AppContext, ClientConfig, ClientError, FileStore, MemoryStore, PreferenceStore, Presentation, Theme};
use estoque_core::dashboard::{compute_metrics, low_stock_products};
use estoque_core::export::{Column, ExportFormat};
use estoque_core::format::{format_number, format_postal_code, format_stock, stock_status_label};
use estoque_core::guard::{evaluate, GuardInput};
use estoque_core::{DashboardMetrics, Language, Message, Product, Sale, Session};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,estoque=debug";

#[derive(Parser, Debug)]
#[clap(name = "estoque", author, version, about = "Estoque Inteligente command-line client")]
struct Args {
    /// Path to estoque.toml (defaults to the platform config directory).
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the preferences file (defaults to the platform data directory).
    #[clap(long, global = true)]
    prefs: Option<PathBuf>,

    /// Viewport width used to initialize the sidebar.
    #[clap(long, global = true, default_value_t = 1280)]
    width: u32,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up an address by postal code (CEP).
    Cep { code: String },

    /// Export a JSON array of objects to a spreadsheet or PDF.
    Export {
        #[clap(long, default_value = "xlsx")]
        format: String,
        #[clap(long)]
        title: String,
        #[clap(long)]
        input: PathBuf,
        /// Comma-separated fields, optionally `Header=field`.
        #[clap(long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Show the dashboard cards, from the API or from local JSON files.
    Dashboard {
        #[clap(long)]
        products: Option<PathBuf>,
        #[clap(long, requires = "products")]
        sales: Option<PathBuf>,
    },

    /// List products at or below their minimum stock.
    LowStock {
        #[clap(long)]
        input: PathBuf,
    },

    /// Show or set the UI language.
    Language { code: Option<String> },

    /// Show or set the theme.
    Theme { mode: Option<String> },

    /// Show or set the sidebar state.
    Sidebar { state: Option<String> },

    /// Evaluate the route guard for a path.
    Guard {
        path: String,
        #[clap(long)]
        anonymous: bool,
        #[clap(long)]
        admin: bool,
        #[clap(long)]
        onboarded: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = ClientConfig::load_or_default(args.config.clone());
    let store = preference_store(args.prefs.clone());
    let sink = Arc::new(DirectorySink::new(config.export.resolved_output_dir()));
    let ctx = AppContext::build(config, store, sink, args.width)?;

    run(&ctx, args.command).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    log_subscriber(filter).init();
}

fn log_subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn preference_store(path: Option<PathBuf>) -> Arc<dyn PreferenceStore> {
    match path.or_else(ClientConfig::default_preferences_path) {
        Some(path) => {
            debug!(?path, "Using preference file");
            Arc::new(FileStore::new(path))
        }
        None => Arc::new(MemoryStore::new()),
    }
}

async fn run(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    let language = ctx.locale.language();
    let t = language.translations();

    match command {
        Command::Cep { code } => match ctx.postal.lookup(&code).await {
            Ok(address) => {
                println!("{}", format_postal_code(&address.postal_code));
                println!("{}", address.street);
                if let Some(complement) = &address.complement {
                    println!("{complement}");
                }
                println!("{}", address.neighborhood);
                println!("{} - {}", address.city, address.state);
            }
            Err(err) => bail!("{}", err.message(language)),
        },

        Command::Export {
            format,
            title,
            input,
            columns,
        } => {
            let format: ExportFormat = format.parse()?;
            let rows = read_rows(&input)?;
            let columns = parse_columns(&columns)?;
            let today = chrono::Local::now().date_naive();

            match ctx.exports.export_rows(&title, &rows, &columns, format, today) {
                Ok(download) => match download.path {
                    Some(path) => println!("{}", path.display()),
                    None => println!("{}", download.file_name),
                },
                Err(err) => return Err(report(err, language)),
            }
        }

        Command::Dashboard { products, sales } => {
            let metrics = match products {
                Some(products) => {
                    let products: Vec<Product> = read_json(&products)?;
                    let sales: Vec<Sale> = match sales {
                        Some(path) => read_json(&path)?,
                        None => Vec::new(),
                    };
                    compute_metrics(&products, &sales, chrono::Utc::now().date_naive())
                }
                None => ctx.api.dashboard().await.map_err(|e| report(e, language))?,
            };
            print_dashboard(&metrics, language);
        }

        Command::LowStock { input } => {
            let products: Vec<Product> = read_json(&input)?;
            let low = low_stock_products(&products);
            println!("{} ({})", t.get(Message::DashboardLowStock), low.len());
            for product in low {
                println!(
                    "{:<12} {:<32} {:>10}  {}",
                    product.sku,
                    product.name,
                    format_stock(product.stock, &product.unit, language),
                    stock_status_label(product.stock_status(), language)
                );
            }
        }

        Command::Language { code } => {
            if let Some(code) = code {
                if !ctx.locale.set_language(&code) {
                    let supported: Vec<String> =
                        ctx.locale.supported_languages().into_iter().map(|l| l.code).collect();
                    bail!("unsupported language '{code}' (supported: {})", supported.join(", "));
                }
            }
            let active = ctx.locale.language();
            println!("{} ({})", active.code(), active.native_name());
        }

        Command::Theme { mode } => {
            if let Some(mode) = mode {
                let theme: Theme = mode.parse()?;
                ctx.theme.set_theme(theme);
            }
            println!("{}", ctx.theme.theme());
        }

        Command::Sidebar { state } => {
            match state.as_deref() {
                Some("open") => ctx.sidebar.set_open(true),
                Some("closed") => ctx.sidebar.set_open(false),
                Some(other) => bail!("expected 'open' or 'closed', got '{other}'"),
                None => {}
            }
            println!("{}", if ctx.sidebar.is_open() { "open" } else { "closed" });
        }

        Command::Guard {
            path,
            anonymous,
            admin,
            onboarded,
        } => {
            let session = (!anonymous).then(|| Session {
                user_id: "cli".to_string(),
                name: "CLI".to_string(),
                email: "cli@localhost".to_string(),
                company_id: None,
                is_admin: admin,
                onboarding_complete: onboarded,
            });
            let decision = evaluate(&GuardInput::from_session(session.as_ref()), &path);
            println!("{}", serde_json::to_string(&decision)?);
        }
    }

    Ok(())
}

/// Turns a client error into the CLI's equivalent of its presentation.
fn report(err: ClientError, language: Language) -> anyhow::Error {
    let t = language.translations();
    match err.presentation() {
        Presentation::Redirect(to) => anyhow::anyhow!("not signed in or not allowed (would redirect to {to})"),
        Presentation::Retryable => anyhow::anyhow!("{err} ({})", t.get(Message::CommonRetry)),
        Presentation::Notice if matches!(err, ClientError::Unavailable(_)) => {
            anyhow::anyhow!("{}: {err}", t.get(Message::ErrorExportUnavailable))
        }
        Presentation::Notice | Presentation::Inline => anyhow::Error::new(err),
    }
}

fn print_dashboard(metrics: &DashboardMetrics, language: Language) {
    let t = language.translations();
    let rows = [
        (Message::DashboardTotalProducts, format_number(metrics.total_products, language)),
        (Message::DashboardLowStock, format_number(metrics.low_stock_count, language)),
        (Message::DashboardOutOfStock, format_number(metrics.out_of_stock_count, language)),
        (Message::DashboardInventoryValue, metrics.inventory_value.format(language)),
        (Message::DashboardSalesToday, format_number(metrics.sales_today, language)),
        (Message::DashboardRevenueToday, metrics.revenue_today.format(language)),
        (Message::DashboardRevenueMonth, metrics.revenue_month.format(language)),
    ];
    for (label, value) in rows {
        println!("{:<30} {:>16}", t.get(label), value);
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn read_rows(path: &Path) -> anyhow::Result<Vec<Value>> {
    match read_json::<Value>(path)? {
        Value::Array(rows) => Ok(rows),
        _ => bail!("{} must contain a JSON array", path.display()),
    }
}

/// `name,Estoque=stock` → columns with headers `name` and `Estoque`.
fn parse_columns(specs: &[String]) -> anyhow::Result<Vec<Column<Value>>> {
    let columns: Vec<Column<Value>> = specs
        .iter()
        .map(|spec| spec.trim())
        .filter(|spec| !spec.is_empty())
        .map(|spec| match spec.split_once('=') {
            Some((header, field)) => Column::field(header.trim(), field.trim()),
            None => Column::field(spec, spec),
        })
        .collect();

    if columns.is_empty() {
        bail!("--columns needs at least one field");
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_log_filter_is_respected() {
        tracing::subscriber::with_default(log_subscriber(EnvFilter::new("warn")), || {
            assert!(tracing::enabled!(target: "hyper", Level::WARN));
            assert!(!tracing::enabled!(target: "hyper", Level::TRACE));
            assert!(!tracing::enabled!(target: "estoque_client::query", Level::DEBUG));
        });

        tracing::subscriber::with_default(log_subscriber(EnvFilter::new(DEFAULT_LOG_FILTER)), || {
            assert!(tracing::enabled!(target: "estoque_client::query", Level::DEBUG));
            assert!(!tracing::enabled!(target: "hyper", Level::DEBUG));
        });
    }

    #[test]
    fn test_parse_columns() {
        let columns = parse_columns(&["name".to_string(), " Estoque = stock ".to_string()]).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].header, "name");
        assert_eq!(columns[1].header, "Estoque");
        assert!(parse_columns(&[" ".to_string()]).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["estoque", "guard", "/users", "--admin"]).unwrap();
        assert!(matches!(args.command, Command::Guard { admin: true, .. }));

        let args = Args::try_parse_from([
            "estoque", "export", "--title", "Produtos", "--input", "p.json", "--columns", "name,sku",
        ])
        .unwrap();
        match args.command {
            Command::Export { columns, format, .. } => {
                assert_eq!(columns, vec!["name", "sku"]);
                assert_eq!(format, "xlsx");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
