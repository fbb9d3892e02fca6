use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use crate::config::HandlerConfig;
use crate::dispatcher::IncomingRequest;
use crate::echo::EchoService;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::registry::ServiceRegistry;

/// Command-line interface for jsonrest
///
/// Inspects and exercises the service named in a handler config without an
/// HTTP host.
#[derive(Debug, Parser)]
#[command(name = "jsonrest")]
#[command(about = "Expose service methods as JSON endpoints", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the routes of the configured service
    Routes {
        /// Handler config file (YAML)
        #[arg(short, long, env = "JSONREST_CONFIG")]
        config: PathBuf,
    },
    /// Run one request through the dispatcher and print the response
    Call {
        /// Handler config file (YAML)
        #[arg(short, long, env = "JSONREST_CONFIG")]
        config: PathBuf,

        /// Request URL, mount prefix included (e.g. `/api/echo`)
        #[arg(short, long)]
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        /// Session id to send in the session header
        #[arg(long)]
        session: Option<String>,

        /// Open a session for this user first and send its id
        #[arg(long, conflicts_with = "session")]
        login: Option<String>,

        /// Extra header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

/// Registry with the built-in services.
#[must_use]
pub fn default_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register("echo", |store| Ok(EchoService::new(store)));
    registry
}

/// Runs a parsed command and returns what it would print.
///
/// # Errors
///
/// Fails if the config cannot be loaded, the service is unknown or cannot be
/// built, or a header argument is malformed.
pub fn execute(command: &Commands, registry: &ServiceRegistry) -> anyhow::Result<String> {
    match command {
        Commands::Routes { config } => {
            let config = HandlerConfig::load(config)?;
            let dispatcher = registry.dispatcher_for(&config)?;
            let router = dispatcher.router()?;
            let mut out = format!(
                "service={} count={}\n",
                router.type_name(),
                router.routes().len()
            );
            for line in router.describe_routes() {
                out.push_str(&line);
                out.push('\n');
            }
            Ok(out)
        }
        Commands::Call {
            config,
            path,
            body,
            session,
            login,
            headers,
        } => {
            let config = HandlerConfig::load(config)?;
            let store = Arc::new(config.session.build_store());
            let dispatcher = registry.dispatcher_with_store(&config, Arc::clone(&store))?;

            let mut request = IncomingRequest::new(path.clone())
                .with_remote_addr("cli")
                .with_body(body.clone().unwrap_or_default());
            for header in headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| anyhow!("header `{header}` must look like `name: value`"))?;
                request = request.with_header(name.trim(), value.trim());
            }
            let session_id = match (session, login) {
                (Some(session), _) => Some(session.clone()),
                (None, Some(user)) => Some(store.open(user.clone()).session_id.to_string()),
                (None, None) => None,
            };
            if let Some(session_id) = session_id {
                request = request.with_header(config.session.header.clone(), session_id);
            }

            let response = dispatcher.handle(&request);
            let body = String::from_utf8(response.body_bytes())
                .context("response body is not UTF-8")?;
            Ok(format!("{}\n{}", response.status, body))
        }
    }
}

/// Entry point of the `jsonrest` binary.
///
/// # Errors
///
/// Returns any error from logging setup or command execution.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = match &cli.command {
        Commands::Routes { config } | Commands::Call { config, .. } => config,
    };
    let log_config = match HandlerConfig::load(config_path) {
        Ok(config) => LogConfig::from_env().or_log_path(&config.log_path),
        Err(_) => LogConfig::from_env(),
    };
    let _guard = init_logging_with_config(&log_config)?;

    let output = execute(&cli.command, &default_registry())?;
    println!("{output}");
    Ok(())
}
