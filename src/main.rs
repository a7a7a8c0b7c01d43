use base64::Engine;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use bcgate::cache::CacheStorage;
use bcgate::client::types::{ParseResponse, TransactionRequest};
use bcgate::config::{self, Config};
use bcgate::gateway::{self, GatewayHandle};
use bcgate::{
  logging, ApiClient, CacheLayer, CacheSource, FileTokenStore, HttpRequest, Navigator,
  NetworkTransport, OfflineGateway, Session, SqliteStorage, Transport,
};

#[derive(Parser, Debug)]
#[command(name = "bcgate")]
#[command(about = "Offline-tolerant client for the Beancount bookkeeping app")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bcgate/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Also print logs to stderr
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  #[command(flatten)]
  App(AppCommand),
  /// Inspect or clear the offline cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

/// Commands that run through the offline gateway
#[derive(Subcommand, Debug)]
enum AppCommand {
  /// Log in; the password is read from BCGATE_PASSWORD
  Login {
    #[arg(short, long)]
    username: String,
  },
  /// Forget the stored token
  Logout,
  /// Show session and offline cache state
  Status,
  /// Account balances
  Balance,
  /// Open accounts
  Accounts,
  /// Payment methods, cards and categories accepted by the ledger
  AccountConfig,
  /// Recognise a transaction from text
  ParseText {
    text: String,
    /// Save the recognised transaction right away
    #[arg(long)]
    save: bool,
  },
  /// Recognise a transaction from a receipt image
  ParseImage {
    path: PathBuf,
    /// Save the recognised transaction right away
    #[arg(long)]
    save: bool,
  },
  /// Save a transaction from a JSON file ("-" for stdin)
  Save { path: PathBuf },
  /// Control the ledger viewer
  Fava {
    #[command(subcommand)]
    action: FavaAction,
  },
  /// Fetch any application path through the offline gateway
  Fetch { path: String },
}

#[derive(Subcommand, Debug)]
enum FavaAction {
  Start,
  Stop,
  Status,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// List cache stores
  List,
  /// Delete every cache store; the next run reinstalls
  Purge,
}

/// Navigation for a terminal session: tell the user to sign in again.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
  fn navigate(&self, path: &str) {
    warn!(to = path, "navigating to login boundary");
    eprintln!("Session ended. Sign in again with `bcgate login` ({}).", path);
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let data_dir = config::data_dir()?;
  let _log_guard = logging::init(&data_dir.join("logs"), args.verbose)?;

  let storage = Arc::new(SqliteStorage::open_at(&data_dir.join("cache.db"))?);

  let command = match args.command {
    Command::Cache { action } => return run_cache(&action, &config, storage.as_ref()),
    Command::App(command) => command,
  };

  let gateway = start_gateway(&config, storage)?;
  let state = gateway.ready().await;
  info!(%state, "offline gateway settled");

  let session = Session::new(
    Arc::new(FileTokenStore::in_dir(&data_dir)),
    Arc::new(TerminalNavigator),
  )
  .with_login_path(&config.session.login_path);

  let client = ApiClient::new(
    config.api_base()?,
    Arc::new(gateway.clone()),
    session,
    config.routes(),
  );

  run(command, &client, &gateway, &config).await
}

/// Spawn the gateway worker for the configured cache generation.
fn start_gateway(config: &Config, storage: Arc<SqliteStorage>) -> Result<GatewayHandle> {
  let cache = CacheLayer::new(storage, config.cache_version())
    .with_runtime_caching(config.offline.runtime_caching);

  // The worker and the application context each get their own connection pool
  let worker_network = Arc::new(NetworkTransport::new(config.timeout())?);
  let direct_network = Arc::new(NetworkTransport::new(config.timeout())?);

  let gateway = OfflineGateway::new(cache, worker_network, config.routes(), config.origin()?)
    .with_seeds(config.offline.seeds.clone());

  Ok(gateway::spawn(gateway, direct_network))
}

async fn run(
  command: AppCommand,
  client: &ApiClient,
  gateway: &GatewayHandle,
  config: &Config,
) -> Result<()> {
  match command {
    AppCommand::Login { username } => {
      let password = Config::get_password()?;
      client.login(&username, &password).await?;
      println!("Logged in as {}", username);
    }
    AppCommand::Logout => {
      client.logout();
    }
    AppCommand::Status => {
      let auth = if client.is_authenticated() {
        "signed in"
      } else {
        "signed out"
      };
      println!("session:       {}", auth);
      println!("offline cache: {} ({})", config.cache_version().store_name(), gateway.state());
      println!("api:           {}", client.base_url());
    }
    AppCommand::Balance => {
      let balance = client.balance().await?;
      for (account, amount) in &balance.balances {
        println!("{:<40} {:>12.2}", account, amount);
      }
    }
    AppCommand::Accounts => {
      for account in client.accounts().await?.accounts {
        println!("{}", account);
      }
    }
    AppCommand::AccountConfig => {
      let config = client.account_config().await?;
      println!("{}", serde_json::to_string_pretty(&config)?);
    }
    AppCommand::ParseText { text, save } => {
      let parsed = client.parse_text(&text).await?;
      report_parsed(client, parsed, save).await?;
    }
    AppCommand::ParseImage { path, save } => {
      let bytes = std::fs::read(&path)
        .map_err(|e| eyre!("Failed to read image {}: {}", path.display(), e))?;
      let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
      let parsed = client.parse_image(&encoded).await?;
      report_parsed(client, parsed, save).await?;
    }
    AppCommand::Save { path } => {
      let transaction: TransactionRequest = serde_json::from_str(&read_input(&path)?)
        .map_err(|e| eyre!("Invalid transaction JSON: {}", e))?;
      let result = client.save_transaction(&transaction).await?;
      println!("{}", result.message);
    }
    AppCommand::Fava { action } => match action {
      FavaAction::Start => {
        let result = client.start_fava().await?;
        println!("{}", result.message);
        if let Some(url) = result.url {
          println!("{}", url);
        }
      }
      FavaAction::Stop => {
        println!("{}", client.stop_fava().await?.message);
      }
      FavaAction::Status => {
        let status = client.fava_status().await?;
        match (status.running, status.url) {
          (true, Some(url)) => println!("running at {}", url),
          (true, None) => println!("running"),
          (false, _) => println!("stopped"),
        }
      }
    },
    AppCommand::Fetch { path } => {
      let url = config
        .origin()?
        .join(&path)
        .map_err(|e| eyre!("Invalid path '{}': {}", path, e))?;
      let response = gateway.send(HttpRequest::get(url)).await?;
      let source = match response.source {
        CacheSource::Network => "network",
        CacheSource::Offline => "offline cache",
      };
      eprintln!("{} from {} ({} bytes)", response.status, source, response.body.len());
      println!("{}", response.text());
    }
  }

  Ok(())
}

async fn report_parsed(client: &ApiClient, parsed: ParseResponse, save: bool) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(&parsed)?);
  if save {
    let result = client
      .save_transaction(&TransactionRequest::from(parsed))
      .await?;
    println!("{}", result.message);
  }
  Ok(())
}

fn read_input(path: &Path) -> Result<String> {
  if path == Path::new("-") {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .map_err(|e| eyre!("Failed to read stdin: {}", e))?;
    Ok(buf)
  } else {
    std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
  }
}

fn run_cache(action: &CacheAction, config: &Config, storage: &SqliteStorage) -> Result<()> {
  let current = config.cache_version().store_name();

  match action {
    CacheAction::List => {
      let active = storage.active_store()?;
      for name in storage.keys()? {
        let mut marks = Vec::new();
        if name == current {
          marks.push("current");
        }
        if active.as_deref() == Some(name.as_str()) {
          marks.push("active");
        }
        println!(
          "{:<30} {:>5} entries  {}",
          name,
          storage.entry_count(&name)?,
          marks.join(", ")
        );
      }
    }
    CacheAction::Purge => {
      for name in storage.keys()? {
        storage.delete(&name)?;
        println!("deleted {}", name);
      }
    }
  }

  Ok(())
}
