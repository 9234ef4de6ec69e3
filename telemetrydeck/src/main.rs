//! telemetrydeck - send TelemetryDeck signals from the command line
//!
//! Useful for shell scripts and CI jobs that want to report usage without
//! linking the library. Settings come from the config file, then from
//! environment variables and flags, later sources winning.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/telemetrydeck/config.toml (~/.config/telemetrydeck/config.toml)
//! - Logs: $XDG_STATE_HOME/telemetrydeck/telemetrydeck.log (~/.local/state/telemetrydeck/telemetrydeck.log)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use telemetrydeck_core::config::ClientConfig;
use telemetrydeck_core::{
    generate_fallback_user_id, hash_user_id, Client, ClientOption, Config, Delivery, Payload,
    DEFAULT_ENDPOINT,
};

#[derive(Parser)]
#[command(name = "telemetrydeck")]
#[command(about = "Send TelemetryDeck signals")]
#[command(version)]
struct Args {
    /// Write debug logs to the state directory
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one signal and wait for the server to answer
    Send {
        /// Signal type, e.g. "MyNamespace.mySignalType"
        signal_type: String,

        /// Payload entry; values are parsed as JSON, falling back to a string
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Print the user ID and the hash that would be sent
    Whoami {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Show the effective configuration
    Config {
        #[command(flatten)]
        client: ClientArgs,
    },
}

/// Client settings that override the config file
#[derive(clap::Args, Debug, Default)]
struct ClientArgs {
    /// TelemetryDeck app ID
    #[arg(long, env = "TELEMETRY_APP_ID")]
    app_id: Option<String>,

    /// Ingest endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// User identifier (hashed before sending)
    #[arg(long)]
    user_id: Option<String>,

    /// Salt appended to the user ID before hashing
    #[arg(long = "salt", env = "TELEMETRY_USER_HASH_SALT")]
    hash_salt: Option<String>,

    /// Session identifier
    #[arg(long)]
    session_id: Option<String>,

    /// Flag the signal as test data and print failure details
    #[arg(long)]
    test_mode: bool,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ClientArgs {
    fn merge_into(self, config: &mut ClientConfig) {
        if self.app_id.is_some() {
            config.app_id = self.app_id;
        }
        if self.endpoint.is_some() {
            config.endpoint = self.endpoint;
        }
        if self.user_id.is_some() {
            config.user_id = self.user_id;
        }
        if self.hash_salt.is_some() {
            config.hash_salt = self.hash_salt;
        }
        if self.session_id.is_some() {
            config.session_id = self.session_id;
        }
        if self.test_mode {
            config.test_mode = true;
        }
        if self.timeout_secs.is_some() {
            config.timeout_secs = self.timeout_secs;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    let mut config = if args.config.is_some() {
        Config::load_from(&config_path)
    } else {
        Config::load()
    }
    .context("failed to load configuration")?;

    let _log_guard = if args.verbose {
        Some(
            telemetrydeck_core::logging::init(&config.logging)
                .context("failed to initialize logging")?,
        )
    } else {
        None
    };

    match args.command {
        Command::Send {
            signal_type,
            params,
            client,
        } => {
            client.merge_into(&mut config.client);
            cmd_send(&config.client, &signal_type, &params)
        }
        Command::Whoami { client } => {
            client.merge_into(&mut config.client);
            cmd_whoami(&config.client);
            Ok(())
        }
        Command::Config { client } => {
            client.merge_into(&mut config.client);
            cmd_config(&config, &config_path);
            Ok(())
        }
    }
}

fn cmd_send(config: &ClientConfig, signal_type: &str, params: &[String]) -> Result<()> {
    config.validate()?;

    let payload = params
        .iter()
        .map(|p| parse_param(p))
        .collect::<Result<Payload>>()?;

    let mut options = config.to_options();
    options.push(ClientOption::DiagnosticSink(std::sync::Arc::new(
        |line: &str| eprintln!("{}", line),
    )));
    let client = Client::new(config.app_id.clone().unwrap_or_default(), options)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;

    let delivery = runtime.block_on(client.deliver(signal_type, Some(payload)))?;
    tracing::info!(signal_type, ?delivery, "Signal dispatched");

    match delivery {
        Delivery::Accepted(status) => {
            println!("Signal {} sent (HTTP {})", signal_type, status);
            Ok(())
        }
        Delivery::Rejected(status) => bail!("server rejected signal with HTTP {}", status),
        Delivery::TransportFailed(reason) => bail!("could not reach server: {}", reason),
    }
}

fn cmd_whoami(config: &ClientConfig) {
    let user_id = config
        .user_id
        .clone()
        .unwrap_or_else(generate_fallback_user_id);
    let salt = config.hash_salt.as_deref().unwrap_or("");

    println!("User ID:      {}", user_id);
    println!("User ID hash: {}", hash_user_id(&user_id, salt));
}

fn cmd_config(config: &Config, path: &std::path::Path) {
    let client = &config.client;

    println!("TelemetryDeck Configuration");
    println!("===========================");
    println!();
    println!(
        "Config file:  {} ({})",
        path.display(),
        if path.exists() { "found" } else { "not found" }
    );
    println!(
        "App ID:       {}",
        client.app_id.as_deref().unwrap_or("(not set)")
    );
    println!(
        "Endpoint:     {}",
        client.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    );
    println!(
        "User ID:      {}",
        client.user_id.as_deref().unwrap_or("(machine fingerprint)")
    );
    println!(
        "Hash salt:    {}",
        if client.hash_salt.as_deref().unwrap_or("").is_empty() {
            "(none)"
        } else {
            "(set)"
        }
    );
    println!(
        "Session ID:   {}",
        client.session_id.as_deref().unwrap_or("(generated)")
    );
    println!("Test mode:    {}", client.test_mode);
    match client.timeout_secs {
        Some(secs) => println!("Timeout:      {}s", secs),
        None => println!("Timeout:      (transport default)"),
    }
    println!("Log level:    {}", config.logging.level);

    if let Err(e) = client.validate() {
        println!();
        println!("Warning: {}", e);
    }
}

/// Parse a `KEY=VALUE` payload entry
fn parse_param(param: &str) -> Result<(String, Value)> {
    let Some((key, value)) = param.split_once('=') else {
        bail!("payload entry {:?} is not KEY=VALUE", param);
    };
    if key.is_empty() {
        bail!("payload entry {:?} has an empty key", param);
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param_json_values() {
        assert_eq!(parse_param("count=42").unwrap(), ("count".into(), json!(42)));
        assert_eq!(parse_param("ok=true").unwrap(), ("ok".into(), json!(true)));
        assert_eq!(
            parse_param("tags=[\"a\",\"b\"]").unwrap(),
            ("tags".into(), json!(["a", "b"]))
        );
    }

    #[test]
    fn test_parse_param_falls_back_to_string() {
        assert_eq!(
            parse_param("command=create").unwrap(),
            ("command".into(), json!("create"))
        );
        assert_eq!(
            parse_param("query=a=b").unwrap(),
            ("query".into(), json!("a=b"))
        );
        assert_eq!(parse_param("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn test_parse_param_rejects_malformed() {
        assert!(parse_param("no-separator").is_err());
        assert!(parse_param("=value").is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut config = ClientConfig {
            app_id: Some("from-file".to_string()),
            endpoint: Some("http://file.invalid/".to_string()),
            ..Default::default()
        };
        let args = ClientArgs {
            app_id: Some("from-flag".to_string()),
            test_mode: true,
            ..Default::default()
        };

        args.merge_into(&mut config);
        assert_eq!(config.app_id.as_deref(), Some("from-flag"));
        assert_eq!(config.endpoint.as_deref(), Some("http://file.invalid/"));
        assert!(config.test_mode);
    }
}
