use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pastelite_common::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Storage {
    /// Persistent RocksDB database at `--database`.
    Rocksdb,
    /// Process memory; everything is lost on exit.
    Memory,
}

/// Pastelite server.
#[derive(Parser, Debug)]
pub struct Opts {
    /// Address to listen on.
    #[clap(long, env = "PASTELITE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,
    /// Directory of the RocksDB database.
    #[clap(long, env = "PASTELITE_DATABASE", default_value = "database")]
    pub database: PathBuf,
    #[clap(long, env = "PASTELITE_STORAGE", value_enum, default_value = "rocksdb")]
    pub storage: Storage,
    /// Base URL used in share links. Derived from the request's `Host` and
    /// `X-Forwarded-Proto` headers when unset.
    #[clap(long, env = "PASTELITE_PUBLIC_URL")]
    pub public_url: Option<Url>,
    /// Honor the `x-test-now-ms` header. Never enable in production.
    #[clap(
        long,
        env = "TEST_MODE",
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new(),
        default_value = "false"
    )]
    pub test_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unset(var: &str) -> bool {
        std::env::var_os(var).is_none()
    }

    // Each default is only checked when its env fallback is absent.
    #[test]
    fn defaults() {
        let opts = Opts::try_parse_from(["pastelite-server"]).unwrap();
        if unset("PASTELITE_BIND") {
            assert_eq!(opts.bind, "0.0.0.0:8080".parse().unwrap());
        }
        if unset("PASTELITE_DATABASE") {
            assert_eq!(opts.database, PathBuf::from("database"));
        }
        if unset("PASTELITE_STORAGE") {
            assert_eq!(opts.storage, Storage::Rocksdb);
        }
        if unset("PASTELITE_PUBLIC_URL") {
            assert!(opts.public_url.is_none());
        }
        if unset("TEST_MODE") {
            assert!(!opts.test_mode);
        }
    }

    #[test]
    fn explicit_flags() {
        let opts = Opts::try_parse_from([
            "pastelite-server",
            "--bind",
            "127.0.0.1:9000",
            "--database",
            "/tmp/pastes",
            "--storage",
            "memory",
            "--public-url",
            "https://paste.example.com",
            "--test-mode",
            "1",
        ])
        .unwrap();
        assert_eq!(opts.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(opts.database, PathBuf::from("/tmp/pastes"));
        assert_eq!(opts.storage, Storage::Memory);
        assert_eq!(
            opts.public_url.unwrap().as_str(),
            "https://paste.example.com/"
        );
        assert!(opts.test_mode);
    }
}
