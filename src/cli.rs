use clap::{Args, Parser, Subcommand};
use offline_shell::config::{
    AppConfig, CacheNames, DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_VERSION, DEFAULT_PROBE_INTERVAL,
    FileConfig, WorkerConfig, parse_duration,
};
use offline_shell::types::PushPayload;
use offline_shell::types::push::Subscription;
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
const DEFAULT_DATA_DIR: &str = "./offline-shell-data";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(AppConfig),
    SendPush(AppConfig, Subscription, PushPayload),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        return RunOutcome::Exit(run_init(args));
    }

    let file = match cli.config.as_deref().map(FileConfig::load).transpose() {
        Ok(file) => file.unwrap_or_default(),
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };
    let config = match resolve_app_config(&cli, file) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    match cli.command {
        Some(Command::SendPush(args)) => {
            let (subscription, payload) = args.into_parts();
            RunOutcome::SendPush(config, subscription, payload)
        }
        _ => RunOutcome::Serve(config),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "offline-shell",
    version,
    about = "Offline-first front for the Abu-Abbad web app"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "OFFLINE_SHELL_UPSTREAM")]
    upstream: Option<String>,
    #[arg(long, env = "OFFLINE_SHELL_LISTEN")]
    listen: Option<String>,
    #[arg(long, env = "OFFLINE_SHELL_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    app_name: Option<String>,
    #[arg(long, env = "OFFLINE_SHELL_CACHE_VERSION")]
    cache_version: Option<String>,
    #[arg(long)]
    network_timeout: Option<String>,
    #[arg(long)]
    max_replay_attempts: Option<u32>,
    #[arg(long)]
    probe_interval: Option<String>,
    #[arg(long, env = "OFFLINE_SHELL_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "OFFLINE_SHELL_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "OFFLINE_SHELL_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a VAPID key pair for push notifications.
    Init(InitArgs),
    /// Send one push message to a browser subscription.
    SendPush(SendPushArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

#[derive(Args, Debug)]
struct SendPushArgs {
    #[arg(long)]
    endpoint: String,
    #[arg(long)]
    p256dh: String,
    #[arg(long)]
    auth: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    body: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    require_interaction: bool,
}

impl SendPushArgs {
    fn into_parts(self) -> (Subscription, PushPayload) {
        let subscription = Subscription {
            endpoint: self.endpoint,
            p256dh: self.p256dh,
            auth: self.auth,
        };
        let payload = PushPayload {
            title: self.title,
            body: self.body,
            icon: None,
            tag: self.tag,
            require_interaction: self.require_interaction.then_some(true),
            data: self.url.map(|url| serde_json::json!({ "url": url })),
        };
        (subscription, payload)
    }
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match offline_shell::VapidCredentials::generate() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    for line in credentials.env_lines(&subject) {
        println!("{line}");
    }
    if show_subject_note {
        println!();
        println!("Note: replace OFFLINE_SHELL_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

/// Flags win over the config file, which wins over built-in defaults.
fn resolve_app_config(cli: &Cli, file: FileConfig) -> Result<AppConfig, String> {
    let upstream = cli
        .upstream
        .clone()
        .or(file.upstream)
        .ok_or("--upstream is required unless using a subcommand")?;
    let mut origin =
        Url::parse(upstream.trim()).map_err(|err| format!("invalid upstream '{upstream}': {err}"))?;
    if !matches!(origin.scheme(), "http" | "https") {
        return Err(format!("upstream must be http or https, got '{upstream}'"));
    }
    if !origin.path().ends_with('/') {
        let path = format!("{}/", origin.path());
        origin.set_path(&path);
    }

    let listen_raw = cli
        .listen
        .clone()
        .or(file.listen)
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let listen: SocketAddr = listen_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid listen address '{listen_raw}'"))?;

    let mut worker = WorkerConfig::new(origin);
    let prefix = file
        .cache_prefix
        .unwrap_or_else(|| DEFAULT_CACHE_PREFIX.to_string());
    let version = cli
        .cache_version
        .clone()
        .or(file.cache_version)
        .unwrap_or_else(|| DEFAULT_CACHE_VERSION.to_string());
    if prefix.trim().is_empty() || version.trim().is_empty() {
        return Err("cache prefix and version cannot be empty".to_string());
    }
    worker.cache_names = CacheNames::new(prefix.trim(), version.trim());

    if let Some(name) = cli.app_name.clone().or(file.app_name) {
        worker.notification_title = name;
    }
    if let Some(api_prefix) = file.api_prefix {
        worker.api_prefix = api_prefix;
    }
    if let Some(manifest) = file.shell_manifest {
        if manifest.is_empty() {
            return Err("shell_manifest cannot be empty".to_string());
        }
        worker.shell_manifest = manifest;
    }
    if let Some(offline_page) = file.offline_page {
        worker.offline_page = offline_page;
    }
    if let Some(fallback_icon) = file.fallback_icon {
        worker.fallback_icon = fallback_icon;
    }
    if let Some(sync_tag) = file.sync_tag {
        worker.sync_tag = sync_tag;
    }
    if let Some(endpoint) = file.messages_endpoint {
        worker.messages_endpoint = endpoint;
    }
    if let Some(raw) = cli.network_timeout.clone().or(file.network_timeout) {
        worker.network_timeout = parse_duration(&raw)?;
        if worker.network_timeout.is_zero() {
            return Err("network timeout must be greater than 0".to_string());
        }
    }
    if let Some(attempts) = cli.max_replay_attempts.or(file.max_replay_attempts) {
        worker.max_replay_attempts = attempts;
    }
    if !worker.shell_manifest.contains(&worker.offline_page) {
        return Err(format!(
            "offline page '{}' must be part of the shell manifest",
            worker.offline_page
        ));
    }

    let probe_interval = match cli.probe_interval.clone().or(file.probe_interval) {
        Some(raw) => Some(parse_duration(&raw)?).filter(|interval| !interval.is_zero()),
        None => Some(DEFAULT_PROBE_INTERVAL),
    };

    Ok(AppConfig {
        listen,
        data_dir: cli
            .data_dir
            .clone()
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        worker,
        probe_interval,
        vapid_private_key: cli.vapid_private_key.clone(),
        vapid_public_key: cli.vapid_public_key.clone(),
        vapid_subject: cli.vapid_subject.clone(),
    })
}
