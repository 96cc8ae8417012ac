use crate::demo::{self, TaskStore};
use crate::dispatcher::Dispatcher;
use crate::runtime_config::RuntimeConfig;
use crate::security::{JwtRoleAuthorizer, StaticTokenAuthorizer};
use crate::server::{AppService, HttpServer};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for bendf
#[derive(Parser, Debug)]
#[command(name = "bendf")]
#[command(about = "Minimal HTTP request dispatcher", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the demo route table over HTTP
    Serve(ServeOptions),
    /// Print the demo route table
    Routes,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeOptions {
    /// Address to bind (default 0.0.0.0:$PORT)
    #[arg(long)]
    pub addr: Option<String>,

    /// Path serving the JSON route catalog
    #[arg(long, env = "BENDF_DOCS_PATH")]
    pub docs_path: Option<String>,

    /// Bearer token that is granted the ADMIN role
    #[arg(long, env = "BENDF_ADMIN_TOKEN", conflicts_with = "jwt_roles")]
    pub admin_token: Option<String>,

    /// Authorize from the `role` claim of the bearer JWT (signature not verified)
    #[arg(long, default_value_t = false)]
    pub jwt_roles: bool,
}

/// Assemble the demo dispatcher for the given options.
///
/// # Errors
///
/// Fails when a route definition is rejected or the docs path does not start with `/`.
pub fn build_dispatcher(
    options: &ServeOptions,
    config: &RuntimeConfig,
    store: &Arc<TaskStore>,
) -> Result<Dispatcher> {
    let routes = demo::routes(store).context("Invalid demo route table")?;
    let mut builder = Dispatcher::builder().config(config).routes(routes);

    if let Some(path) = &options.docs_path {
        if !path.starts_with('/') {
            return Err(anyhow!("--docs-path must start with '/', got {path:?}"));
        }
        builder = builder.docs_path(path.clone());
    }

    if options.jwt_roles {
        builder = builder.authorizer(JwtRoleAuthorizer::new());
    } else if let Some(token) = &options.admin_token {
        builder = builder.authorizer(
            StaticTokenAuthorizer::new()
                .token(token.clone(), json!({ "id": "admin", "role": "ADMIN" })),
        );
    }

    Ok(builder.build())
}

/// Parse the process arguments and run the selected command.
///
/// # Errors
///
/// Whatever [`run`] returns.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

/// Run an already parsed command line.
///
/// # Errors
///
/// Invalid options, a port that cannot be bound, or a server that panicked.
pub fn run(cli: Cli) -> Result<()> {
    let config = RuntimeConfig::from_env();
    let store = Arc::new(TaskStore::new());

    match cli.command {
        Commands::Serve(options) => {
            let dispatcher = Arc::new(build_dispatcher(&options, &config, &store)?);
            let addr = options
                .addr
                .clone()
                .unwrap_or_else(|| format!("0.0.0.0:{}", config.port));

            may::config().set_stack_size(config.stack_size);
            let handle = HttpServer(AppService::new(Arc::clone(&dispatcher)))
                .start(addr.as_str())
                .with_context(|| format!("Failed to start server on {addr}"))?;
            info!(
                addr = %handle.addr(),
                authorizer = dispatcher.has_authorizer(),
                docs_path = ?dispatcher.docs_path(),
                "bendf serving demo routes"
            );
            handle
                .join()
                .map_err(|_| anyhow!("Server coroutine panicked"))?;
            Ok(())
        }
        Commands::Routes => {
            let dispatcher = build_dispatcher(&ServeOptions::default(), &config, &store)?;
            dispatcher.router().dump_routes();
            Ok(())
        }
    }
}
