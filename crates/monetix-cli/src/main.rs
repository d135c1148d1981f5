//! Monetix CLI
//!
//! Runs the Open Cloud relay for the browser console and manages
//! gamepasses and developer products straight from the terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use monetix_core::catalog::ResourceKind;
use monetix_core::config::AppConfig;
use monetix_core::error::Result;
use monetix_core::session::{SessionCache, SledSessionStore};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod relay;

use commands::{CreateArgs, CredentialArgs, UpdateArgs};

/// Monetix - gamepass and developer product manager for Roblox
#[derive(Parser, Debug)]
#[command(name = "monetix")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the CORS relay in front of the Open Cloud API
    Relay {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Address to listen on
        #[arg(long)]
        host: Option<String>,

        /// Upstream API host
        #[arg(long)]
        upstream: Option<String>,

        /// Built console frontend to serve alongside the relay
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    #[command(flatten)]
    Api(ApiCommand),
}

/// Commands that talk to the Open Cloud API or the session cache
#[derive(Subcommand, Debug)]
enum ApiCommand {
    /// List every item of a kind, with icons
    List {
        kind: ResourceKind,
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Create a single item
    Create {
        kind: ResourceKind,
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Price in Robux
        #[arg(long)]
        price: String,
        /// Enable regional pricing
        #[arg(long)]
        regional: bool,
        /// Icon image
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Update the given fields of an existing item
    Update {
        kind: ResourceKind,
        id: String,
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Price in Robux
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        for_sale: Option<bool>,
        #[arg(long)]
        regional: Option<bool>,
        /// Icon image
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Create many items one after another
    BulkCreate {
        kind: ResourceKind,
        #[command(flatten)]
        credentials: Credentials,
        /// JSON array of rows: name, description, price, isRegionalPricingEnabled, image
        #[arg(long)]
        file: PathBuf,
        /// Print successful rows as Name/ID/Price tab-separated lines
        #[arg(long)]
        tsv: bool,
    },

    /// Manage saved API key / universe pairs
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// Most recently used first
    List,
    Save {
        #[arg(long, env = "ROBLOX_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, env = "ROBLOX_UNIVERSE_ID")]
        universe: String,
        /// Experience name shown in the list
        #[arg(long, default_value = "")]
        name: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug, Clone)]
struct Credentials {
    /// Open Cloud API key
    #[arg(long, env = "ROBLOX_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Universe (experience) id
    #[arg(long, env = "ROBLOX_UNIVERSE_ID")]
    universe: Option<String>,

    /// Use a saved session instead of an explicit key and universe
    #[arg(long)]
    session: Option<String>,

    /// API host or relay URL (e.g. http://127.0.0.1:3001/api/relay)
    #[arg(long, env = "MONETIX_BASE_URL")]
    base_url: Option<String>,
}

impl From<Credentials> for CredentialArgs {
    fn from(c: Credentials) -> Self {
        Self {
            api_key: c.api_key,
            universe_id: c.universe,
            session: c.session,
            base_url: c.base_url,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> std::result::Result<(), String> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path).map_err(|e| e.to_string())?,
        None => AppConfig::new(),
    };
    let json_output = matches!(cli.format, OutputFormat::Json);

    match cli.command {
        Command::Relay {
            port,
            host,
            upstream,
            static_dir,
        } => {
            let mut relay_config = config.relay;
            if let Some(port) = port {
                relay_config.port = port;
            }
            if let Some(host) = host {
                relay_config.host = host;
            }
            if let Some(upstream) = upstream {
                relay_config.upstream_url = upstream;
            }
            if static_dir.is_some() {
                relay_config.static_dir = static_dir;
            }
            relay::run_relay(relay_config).await
        }
        Command::Api(command) => run_api_command(command, &config, json_output)
            .await
            .map_err(|e| e.to_string()),
    }
}

async fn run_api_command(command: ApiCommand, config: &AppConfig, json_output: bool) -> Result<()> {
    let cache = SessionCache::new(SledSessionStore::open_default()?);

    match command {
        ApiCommand::Sessions { action } => match action {
            SessionAction::List => commands::sessions_list(&cache, json_output).await,
            SessionAction::Save {
                api_key,
                universe,
                name,
            } => commands::sessions_save(&cache, &api_key, &universe, &name).await,
            SessionAction::Delete { id } => commands::sessions_delete(&cache, &id).await,
        },
        ApiCommand::List { kind, credentials } => {
            let args = CredentialArgs::from(credentials);
            let creds = commands::resolve_credentials(&args, &cache).await?;
            let client = commands::build_client(config, &args, &creds)?;
            commands::list(&client, &creds, kind, json_output).await
        }
        ApiCommand::Create {
            kind,
            credentials,
            name,
            description,
            price,
            regional,
            image,
        } => {
            let args = CredentialArgs::from(credentials);
            let creds = commands::resolve_credentials(&args, &cache).await?;
            let client = commands::build_client(config, &args, &creds)?;
            let create = CreateArgs {
                name,
                description,
                price,
                regional_pricing: regional,
                image,
            };
            commands::create(&client, &creds, kind, create, json_output).await
        }
        ApiCommand::Update {
            kind,
            id,
            credentials,
            name,
            description,
            price,
            for_sale,
            regional,
            image,
        } => {
            let args = CredentialArgs::from(credentials);
            let creds = commands::resolve_credentials(&args, &cache).await?;
            let client = commands::build_client(config, &args, &creds)?;
            let update = UpdateArgs {
                name,
                description,
                price,
                for_sale,
                regional_pricing: regional,
                image,
            };
            commands::update(&client, &creds, kind, &id, update).await
        }
        ApiCommand::BulkCreate {
            kind,
            credentials,
            file,
            tsv,
        } => {
            let args = CredentialArgs::from(credentials);
            let creds = commands::resolve_credentials(&args, &cache).await?;
            let client = commands::build_client(config, &args, &creds)?;
            commands::bulk_create(&client, config, &creds, kind, &file, json_output, tsv).await
        }
    }
}
