use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Recital speech synthesis service
#[derive(Debug, Parser)]
#[command(name = "recital", about = "Cached text-to-speech over HTTP")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "recital.toml", env = "RECITAL_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "RECITAL_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter in `RUST_LOG` syntax
    #[arg(long, default_value = "info", env = "RECITAL_LOG")]
    pub log_filter: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["recital"]).unwrap();
        assert_eq!(args.config, PathBuf::from("recital.toml"));
        assert_eq!(args.listen, None);
        assert_eq!(args.log_filter, "info");
    }

    #[test]
    fn overrides() {
        let args = Args::try_parse_from([
            "recital",
            "-c",
            "/etc/recital.toml",
            "--listen",
            "127.0.0.1:9000",
            "--log-filter",
            "tts=debug,info",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/recital.toml"));
        assert_eq!(args.listen, Some(SocketAddr::from(([127, 0, 0, 1], 9000))));
        assert_eq!(args.log_filter, "tts=debug,info");
    }

    #[test]
    fn rejects_bad_listen_address() {
        assert!(Args::try_parse_from(["recital", "--listen", "not-an-address"]).is_err());
    }
}
