use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use halyard::api::client::HalyardClient;
use halyard::api::error::{format_api_error, ApiError};
use halyard::config::Config;
use halyard::output::{render, OutputFormat};
use halyard::resource::{callers, ImageOptions, SignalingConfig};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Command-line client for the Halyard API
#[derive(Parser, Debug)]
#[command(name = "halyard", version = halyard::VERSION, about, long_about = None)]
struct Args {
    /// Root URL of the Halyard API
    #[arg(long)]
    base_url: Option<String>,

    /// User id for new instances (prompted for when signaling is enabled and unset)
    #[arg(short, long)]
    user_id: Option<String>,

    /// Signaling server address passed to new instances
    #[arg(long, requires = "sig_server_port")]
    sig_server_addr: Option<String>,

    /// Signaling server port passed to new instances
    #[arg(long, requires = "sig_server_addr")]
    sig_server_port: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage instances
    Instance {
        #[command(subcommand)]
        action: InstanceAction,
    },
    /// Manage user disks
    Disk {
        #[command(subcommand)]
        action: DiskAction,
    },
    /// Manage base images
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },
    /// Inspect or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum InstanceAction {
    /// Create a new instance
    Create,
    /// Show instance details
    Info {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Stop (delete) instances, keeping their disks
    Stop {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List instances
    List,
}

#[derive(Subcommand, Debug)]
enum DiskAction {
    /// Restore user disks as new instances
    Restore {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Delete user disks
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List restorable disks
    List,
}

#[derive(Subcommand, Debug)]
enum ImageAction {
    /// Build a new base image
    Create(ImageCreateArgs),
    /// Show image details
    Info {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Delete images
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List images
    List,
}

#[derive(clap::Args, Debug, Clone)]
struct ImageCreateArgs {
    /// Name of the instance used to build the image
    #[arg(long)]
    build_instance: Option<String>,
    /// Build branch to pull artifacts from
    #[arg(long)]
    build_branch: Option<String>,
    /// Build target to pull artifacts from
    #[arg(long)]
    build_target: Option<String>,
    /// Build id (latest when unset)
    #[arg(long)]
    build_id: Option<String>,
    /// Name of the resulting image
    #[arg(long)]
    dest_image: Option<String>,
    /// Image family of the resulting image
    #[arg(long)]
    dest_family: Option<String>,
    /// Rebuild even if the image already exists
    #[arg(long)]
    respin: bool,
}

impl From<ImageCreateArgs> for ImageOptions {
    fn from(args: ImageCreateArgs) -> Self {
        Self {
            build_instance: args.build_instance,
            build_branch: args.build_branch,
            build_target: args.build_target,
            build_id: args.build_id,
            dest_image: args.dest_image,
            dest_family: args.dest_family,
            respin: args.respin,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the saved configuration
    Show,
    /// Update and save configuration values
    Set {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        /// Replace the tag list (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, requires = "sig_server_port")]
        sig_server_addr: Option<String>,
        #[arg(long, requires = "sig_server_addr")]
        sig_server_port: Option<String>,
        /// Stop sending signaling details
        #[arg(long, conflicts_with_all = ["sig_server_addr", "sig_server_port"])]
        no_signaling: bool,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Logging disabled: cannot open {}: {}", log_path.display(), err);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG, when set, overrides --log-level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(tracing_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("halyard started with log level: {:?}", level);
    tracing::debug!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("halyard").join("halyard.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".halyard").join("halyard.log");
    }
    PathBuf::from("halyard.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let config = Config::load();

    match args.command {
        Command::Config { action } => run_config(action, config, args.output),
        Command::Instance { ref action } => {
            let client = build_client(&args, &config)?;
            run_instance(action, &client, &args, &config).await
        }
        Command::Disk { ref action } => {
            let client = build_client(&args, &config)?;
            run_disk(action, &client, args.output).await
        }
        Command::Image { ref action } => {
            let client = build_client(&args, &config)?;
            run_image(action, &client, args.output).await
        }
    }
}

/// Build the API client (CLI > config > build-time defaults)
fn build_client(args: &Args, config: &Config) -> Result<HalyardClient> {
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.effective_base_url());

    let mut profile = config.request_profile();
    if let (Some(addr), Some(port)) = (&args.sig_server_addr, &args.sig_server_port) {
        profile.signaling = Some(SignalingConfig::new(addr, port));
    }

    tracing::info!(
        "Using API at {} (signaling: {})",
        base_url,
        profile.signaling.is_some()
    );

    HalyardClient::new(&base_url, profile)
        .with_context(|| format!("Failed to create client for {}", base_url))
}

/// Read a user id from the terminal
async fn prompt_user_id() -> Result<String> {
    let line = tokio::task::spawn_blocking(|| -> io::Result<String> {
        eprint!("User ID: ");
        io::stderr().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    })
    .await
    .context("User id prompt was interrupted")?
    .context("Failed to read user id")?;

    parse_user_id(&line)
}

/// Blank input (including end of input) is refused
fn parse_user_id(line: &str) -> Result<String> {
    let user_id = line.trim();
    if user_id.is_empty() {
        anyhow::bail!("No user id entered; pass --user-id or save one with `halyard config set`");
    }
    Ok(user_id.to_string())
}

async fn run_instance(
    action: &InstanceAction,
    client: &HalyardClient,
    args: &Args,
    config: &Config,
) -> Result<()> {
    let format = args.output;
    match action {
        InstanceAction::Create => {
            // Only read when signaling is enabled
            let user_id = match args.user_id.clone().or_else(|| config.user_id.clone()) {
                Some(user_id) => user_id,
                None if client.signaling_enabled() => prompt_user_id().await?,
                None => String::new(),
            };
            let result = callers::create_instance(client, user_id.as_str()).await;
            report(vec![(None, result)], format)
        }
        InstanceAction::Info { names } => {
            let results = join_all(names.iter().map(|n| callers::info_instance(client, n))).await;
            report(named(names, results), format)
        }
        InstanceAction::Stop { names } => {
            let results = join_all(names.iter().map(|n| callers::stop_instance(client, n))).await;
            report(named(names, results), format)
        }
        InstanceAction::List => report(vec![(None, callers::list_instances(client).await)], format),
    }
}

async fn run_disk(action: &DiskAction, client: &HalyardClient, format: OutputFormat) -> Result<()> {
    match action {
        DiskAction::Restore { names } => {
            let results = join_all(names.iter().map(|n| callers::restore_disk(client, n))).await;
            report(named(names, results), format)
        }
        DiskAction::Delete { names } => {
            let results = join_all(names.iter().map(|n| callers::delete_disk(client, n))).await;
            report(named(names, results), format)
        }
        DiskAction::List => report(vec![(None, callers::list_disks(client).await)], format),
    }
}

async fn run_image(action: &ImageAction, client: &HalyardClient, format: OutputFormat) -> Result<()> {
    match action {
        ImageAction::Create(create_args) => {
            let options = ImageOptions::from(create_args.clone());
            report(vec![(None, callers::create_image(client, &options).await)], format)
        }
        ImageAction::Info { names } => {
            let results = join_all(names.iter().map(|n| callers::info_image(client, n))).await;
            report(named(names, results), format)
        }
        ImageAction::Delete { names } => {
            let results = join_all(names.iter().map(|n| callers::delete_image(client, n))).await;
            report(named(names, results), format)
        }
        ImageAction::List => report(vec![(None, callers::list_images(client).await)], format),
    }
}

fn run_config(action: ConfigAction, mut config: Config, format: OutputFormat) -> Result<()> {
    match action {
        ConfigAction::Show => {
            if let Some(path) = Config::config_path() {
                eprintln!("# {}", path.display());
            }
            println!("{}", render(&serde_json::to_value(&config)?, format)?);
            Ok(())
        }
        ConfigAction::Set {
            base_url,
            user_id,
            tags,
            sig_server_addr,
            sig_server_port,
            no_signaling,
            branch,
            target,
        } => {
            if base_url.is_some() {
                config.base_url = base_url;
            }
            if user_id.is_some() {
                config.user_id = user_id;
            }
            if !tags.is_empty() {
                config.tags = Some(tags);
            }
            if let (Some(addr), Some(port)) = (sig_server_addr, sig_server_port) {
                config.signaling = Some(SignalingConfig::new(addr, port));
            }
            if no_signaling {
                config.signaling = None;
            }
            if branch.is_some() {
                config.branch = branch;
            }
            if target.is_some() {
                config.target = target;
            }

            config.save().context("Failed to save configuration")?;
            tracing::info!("Configuration saved");
            println!("{}", render(&serde_json::to_value(&config)?, format)?);
            Ok(())
        }
    }
}

fn named(
    names: &[String],
    results: Vec<Result<Value, ApiError>>,
) -> Vec<(Option<&str>, Result<Value, ApiError>)> {
    names.iter().map(|n| Some(n.as_str())).zip(results).collect()
}

/// Print every outcome; fail if any request failed
fn report(outcomes: Vec<(Option<&str>, Result<Value, ApiError>)>, format: OutputFormat) -> Result<()> {
    let total = outcomes.len();
    let labelled = total > 1;
    let mut failed = 0;

    for (name, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                if let (true, Some(name)) = (labelled, name) {
                    println!("==> {} <==", name);
                }
                println!("{}", render(&value, format)?);
            }
            Err(err) => {
                failed += 1;
                match name {
                    Some(name) => eprintln!("Error: {}: {}", name, format_api_error(&err)),
                    None => eprintln!("Error: {}", format_api_error(&err)),
                }
            }
        }
    }

    if failed > 0 {
        return Err(anyhow::anyhow!("{} of {} requests failed", failed, total));
    }
    Ok(())
}
