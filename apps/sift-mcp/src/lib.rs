pub mod server;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::{Result, eyre};

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> Result<()> {
	let config = sift_config::load(&args.config)?;
	let mcp =
		config.mcp.as_ref().ok_or_else(|| eyre::eyre!("mcp section is required for sift-mcp."))?;

	if config.security.bind_localhost_only {
		enforce_loopback(&config.service.mcp_bind)?;
	}

	server::serve_mcp(&config.service.mcp_bind, &config.service.http_bind, mcp).await
}

fn enforce_loopback(mcp_bind: &str) -> Result<()> {
	let bind_addr: SocketAddr = mcp_bind.parse().map_err(|err| {
		eyre::eyre!("service.mcp_bind must be a valid socket address: {err}")
	})?;

	if !bind_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"service.mcp_bind must be a loopback address when security.bind_localhost_only is true."
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::enforce_loopback;

	#[test]
	fn loopback_binds_pass() {
		assert!(enforce_loopback("127.0.0.1:8082").is_ok());
		assert!(enforce_loopback("[::1]:8082").is_ok());
	}

	#[test]
	fn wildcard_bind_is_rejected() {
		let err = enforce_loopback("0.0.0.0:8082").expect_err("expected error");

		assert!(err.to_string().contains("loopback"), "unexpected error: {err}");
	}

	#[test]
	fn malformed_bind_is_rejected() {
		let err = enforce_loopback("localhost").expect_err("expected error");

		assert!(err.to_string().contains("valid socket address"), "unexpected error: {err}");
	}
}
