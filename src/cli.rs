use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

const DEFAULT_AUTH_COOKIE_NAME: &str = "beacon_session";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(SocketAddr, beacon::config::AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Init(ref args)) => return RunOutcome::Exit(run_init(args)),
        Some(Command::AuthKey) => return RunOutcome::Exit(run_auth_key()),
        Some(Command::HashPassword(ref args)) => return RunOutcome::Exit(run_hash_password(args)),
        None => {}
    }

    match resolve_config(&cli) {
        Ok(config) => RunOutcome::Serve(cli.bind, config),
        Err(err) => {
            tracing::error!("{err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "beacon",
    version,
    about = "Channel authorization and web push service"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "BEACON_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, default_value = "Beacon")]
    app_name: String,
    #[arg(long, env = "BEACON_USERS_FILE")]
    users_file: Option<PathBuf>,
    #[arg(long, env = "BEACON_BROADCAST_KEY")]
    broadcast_key: Option<String>,
    #[arg(long, env = "BEACON_BROADCAST_SECRET")]
    broadcast_secret: Option<String>,
    #[arg(long, env = "BEACON_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "BEACON_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "BEACON_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "BEACON_PUSH_TIMEOUT")]
    push_timeout: Option<String>,
    #[arg(long, env = "BEACON_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "BEACON_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "BEACON_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
    #[arg(long, env = "BEACON_AUTH_COOKIE_SECURE")]
    auth_cookie_secure: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a VAPID key pair for web push.
    Init(InitArgs),
    /// Generate a random signing key for session tokens.
    AuthKey,
    /// Hash a password for the users file.
    HashPassword(HashPasswordArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

#[derive(Args, Debug)]
struct HashPasswordArgs {
    password: String,
}

fn run_init(args: &InitArgs) -> i32 {
    let credentials = match beacon::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            tracing::error!(error = %err, "failed to generate VAPID credentials");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject.as_deref() {
        Some(subject) => (subject.to_string(), false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("BEACON_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("BEACON_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("BEACON_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace BEACON_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn run_auth_key() -> i32 {
    let secret = match beacon::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            tracing::error!(error = %err, "failed to generate auth key");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn run_hash_password(args: &HashPasswordArgs) -> i32 {
    if args.password.is_empty() {
        tracing::error!("password cannot be empty");
        return 2;
    }
    match beacon::users::hash_password(&args.password) {
        Ok(hash) => {
            println!("{hash}");
            0
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to hash password");
            1
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<beacon::config::AppConfig, String> {
    let push_timeout = match cli.push_timeout.as_deref() {
        Some(raw) => {
            let timeout = parse_duration(raw, "push timeout")?;
            std::time::Duration::try_from(timeout)
                .map_err(|_| "push timeout must be greater than 0".to_string())?
        }
        None => beacon::push::DEFAULT_DELIVERY_TIMEOUT,
    };

    Ok(beacon::config::AppConfig {
        app_name: cli.app_name.clone(),
        users_file: cli.users_file.clone(),
        auth: resolve_auth_config(cli)?,
        broadcast: resolve_broadcast_config(cli)?,
        vapid_private_key: cli.vapid_private_key.clone(),
        vapid_public_key: cli.vapid_public_key.clone(),
        vapid_subject: cli.vapid_subject.clone(),
        push_timeout,
    })
}

fn resolve_broadcast_config(cli: &Cli) -> Result<Option<beacon::config::BroadcastConfig>, String> {
    match (cli.broadcast_key.as_deref(), cli.broadcast_secret.as_deref()) {
        (None, None) => Ok(None),
        (Some(app_key), Some(secret)) if !app_key.trim().is_empty() && !secret.is_empty() => {
            Ok(Some(beacon::config::BroadcastConfig {
                app_key: app_key.trim().to_string(),
                secret: secret.to_string(),
            }))
        }
        _ => Err("--broadcast-key and --broadcast-secret must be set together".to_string()),
    }
}

fn resolve_auth_config(cli: &Cli) -> Result<beacon::config::AuthConfig, String> {
    let auth_key = cli
        .auth_key
        .as_deref()
        .ok_or("--auth-key is required; generate one with `beacon auth-key`")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    if let Some(name) = cli.auth_cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let token_ttl = match cli.auth_token_ttl.as_deref() {
        Some(raw) => parse_duration(raw, "auth token ttl")?,
        None => default_auth_token_ttl(),
    };
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

    Ok(beacon::config::AuthConfig {
        key: auth_key.to_string(),
        token_ttl,
        cookie_name,
        cookie_secure: cli.auth_cookie_secure,
    })
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(14)
}

fn parse_duration(raw: &str, what: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid {what} '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err(format!("{what} must be greater than 0"));
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid {what} '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}
