//! # CLI Module
//!
//! Command-line front end for the `bendf` binary: serve the demo route table over
//! HTTP, or print it.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! bendf serve --addr 127.0.0.1:8000 --docs-path /docs --admin-token secret
//! ```
//!
//! Options:
//! - `--addr <IP:PORT>` - Listen address (default `0.0.0.0:$PORT`, `PORT` defaulting to 8000)
//! - `--docs-path <PATH>` - Serve the JSON route catalog at this path (`BENDF_DOCS_PATH`)
//! - `--admin-token <TOKEN>` - Grant `ADMIN` to `Authorization: Bearer <TOKEN>`
//!   (`BENDF_ADMIN_TOKEN`)
//! - `--jwt-roles` - Read roles from the `role` claim of an unverified bearer JWT instead
//!
//! Without `--admin-token` or `--jwt-roles` no authorizer is configured and role-protected
//! routes are open.
//!
//! ### `routes`
//!
//! ```bash
//! bendf routes
//! ```
//!
//! Prints one line per route: method, path pattern and required roles.
//!
//! ## Usage from Code
//!
//! ```rust,no_run
//! use bendf::cli::{run, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["bendf", "routes"]);
//! run(cli).unwrap();
//! ```

mod commands;


pub use commands::{build_dispatcher, run, run_cli, Cli, Commands, ServeOptions};
