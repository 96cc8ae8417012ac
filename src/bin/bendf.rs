use bendf::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging_with_config(&LogConfig::from_env())?;
    bendf::cli::run_cli()
}
