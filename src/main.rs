use std::sync::Arc;

use anyhow::Context;
use github_connector::{cli, server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("github-connector {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut cfg = Config::from_env().context("invalid configuration")?;
    if let Some(port) = matches.get_one::<u16>("port") {
        cfg.port = *port;
    }
    log::debug!("loaded {:?}", cfg);

    server::serve(Arc::new(cfg)).await
}
