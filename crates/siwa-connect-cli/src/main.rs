/*
[INPUT]:  CLI arguments, optional YAML configuration file
[OUTPUT]: Challenges, persisted session state, node params, sign-in results
[POS]:    Binary entry point
[UPDATE]: When changing CLI subcommands or the sign-in wiring
*/

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use siwa_connect::{
    AlgodClient, ChainNode, DeflyAdapter, HttpVerifier, KibisisAdapter, LocalWallet, LuteAdapter,
    PeraAdapter, Provider, SigningAdapter, SiwaConfig, SiwaFlowController,
    WalletConnectionManager,
};

#[derive(Parser, Debug)]
#[command(name = "siwa-connect", version, about = "Sign-In with Algorand wallet session client")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh challenge for an address
    Message {
        #[arg(long)]
        address: String,
    },
    /// Inspect or clear the persisted session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Print the chain node's suggested transaction parameters
    Params,
    /// Connect, sign and verify with a local key behind the chosen wallet adapter
    SignIn {
        #[arg(long, value_name = "pera|defly|kibisis|lute")]
        provider: Provider,
        /// Base64 32-byte Ed25519 seed; a new key is generated when omitted
        #[arg(long)]
        seed: Option<String>,
        /// Stop after signing and print the credentials
        #[arg(long = "skip-verify")]
        skip_verify: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    Show,
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = load_config(args.config_path.as_ref())?;

    match args.command {
        Command::Message { address } => {
            let challenge = config.challenge_settings().issue(&address);
            println!("{}", challenge.prepare_message());
        }
        Command::Session { action } => run_session(&config, action)?,
        Command::Params => {
            let node = AlgodClient::new(&config.node_url, &config.client_config())
                .context("create node client")?;
            let params = node
                .suggested_params()
                .await
                .context("fetch suggested params")?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Command::SignIn {
            provider,
            seed,
            skip_verify,
        } => sign_in(&config, provider, seed.as_deref(), skip_verify).await?,
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<SiwaConfig> {
    match path {
        Some(path) => {
            let config = SiwaConfig::from_file(path).context("load config")?;
            info!(config_path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(SiwaConfig::default()),
    }
}

fn run_session(config: &SiwaConfig, action: SessionAction) -> Result<()> {
    let store = config.session_store();
    match action {
        SessionAction::Show => match store.load() {
            Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
            None => println!("no persisted session"),
        },
        SessionAction::Clear => {
            store.clear().context("clear persisted session")?;
            info!(session_file = %config.session_file.display(), "persisted session cleared");
        }
    }
    Ok(())
}

fn local_wallet(seed: Option<&str>) -> Result<LocalWallet> {
    let Some(seed) = seed else {
        return Ok(LocalWallet::generate());
    };
    let bytes = BASE64.decode(seed.trim()).context("seed must be base64")?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("seed must be 32 bytes, got {}", bytes.len()))?;
    Ok(LocalWallet::from_seed(&seed))
}

async fn sign_in(
    config: &SiwaConfig,
    provider: Provider,
    seed: Option<&str>,
    skip_verify: bool,
) -> Result<()> {
    let client_config = config.client_config();
    let wallet = Arc::new(local_wallet(seed)?);
    let node: Arc<dyn ChainNode> = Arc::new(
        AlgodClient::new(&config.node_url, &client_config).context("create node client")?,
    );

    let adapters: Vec<Arc<dyn SigningAdapter>> = vec![
        Arc::new(PeraAdapter::new(wallet.clone())),
        Arc::new(DeflyAdapter::new(wallet.clone(), node.clone())),
        Arc::new(KibisisAdapter::new(Some(wallet.clone()))),
        Arc::new(LuteAdapter::new(Some(wallet.clone()), node)),
    ];
    let manager = Arc::new(WalletConnectionManager::new(adapters, config.session_store()));
    let _watcher = manager.watch_session_drops();

    if let Some(previous) = manager.reconnect_session().await {
        info!(provider = %previous.provider, "replacing persisted session");
        manager.disconnect().await;
    }

    let verifier = HttpVerifier::new(&config.verify_endpoint, &client_config)
        .context("create verifier")?;
    let flow = SiwaFlowController::new(manager, Arc::new(verifier), config.challenge_settings());

    let session = flow.connect(provider).await.context("connect wallet")?;
    info!(%provider, address = %session.address, "connected");

    let credentials = flow.sign_in().await.context("sign challenge")?;
    println!("{}", serde_json::to_string_pretty(&credentials)?);

    if skip_verify {
        println!("state: {}", flow.state().title());
        return Ok(());
    }

    match flow.verify().await {
        Ok(_) => {
            println!("state: {}", flow.state().title());
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "verification failed");
            println!("state: {}", flow.state().title());
            bail!("verify signature: {err}")
        }
    }
}
