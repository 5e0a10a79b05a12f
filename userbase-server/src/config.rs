//! Command line and environment configuration

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rand::rngs::OsRng;
use rand::RngCore;
use std::net::SocketAddr;
use std::path::PathBuf;
use userbase_core::config::parse_duration;
use userbase_core::{
    AuthConfig, DigestAlgorithm, EncryptionConfig, SigningSecret, TokenAlgorithm, TokenConfig,
};

/// Bytes of entropy in a generated signing secret
const EPHEMERAL_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub in_memory: bool,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
    /// Set when no secret was configured and one was generated for this run
    pub ephemeral_secret: bool,
}

pub fn command() -> Command {
    Command::new("userbase-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("User management service with password login and signed tokens")
        .arg(
            Arg::new("bind")
                .long("bind")
                .env("USERBASE_BIND")
                .value_name("ADDR")
                .help("Bind address")
                .default_value("127.0.0.1:8080"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .env("USERBASE_DATA_DIR")
                .value_name("PATH")
                .help("Data directory path")
                .default_value("./data"),
        )
        .arg(
            Arg::new("in-memory")
                .long("in-memory")
                .env("USERBASE_IN_MEMORY")
                .help("Keep users in memory instead of on disk")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .env("USERBASE_LOG_FORMAT")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("token-secret")
                .long("token-secret")
                .env("USERBASE_TOKEN_SECRET")
                .value_name("SECRET")
                .help("HMAC secret for signing tokens, at least 12 bytes; generated per run when unset")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("token-expiration")
                .long("token-expiration")
                .env("USERBASE_TOKEN_EXPIRATION")
                .value_name("DURATION")
                .default_value("4h"),
        )
        .arg(
            Arg::new("token-audience")
                .long("token-audience")
                .env("USERBASE_TOKEN_AUDIENCE")
                .default_value(TokenConfig::DEFAULT_AUDIENCE),
        )
        .arg(
            Arg::new("token-issuer")
                .long("token-issuer")
                .env("USERBASE_TOKEN_ISSUER")
                .default_value(TokenConfig::DEFAULT_ISSUER),
        )
        .arg(
            Arg::new("token-algorithm")
                .long("token-algorithm")
                .env("USERBASE_TOKEN_ALGORITHM")
                .value_parser(["HS256", "HS384", "HS512"])
                .default_value("HS256"),
        )
        .arg(
            Arg::new("token-allowed-algorithms")
                .long("token-allowed-algorithms")
                .env("USERBASE_TOKEN_ALLOWED_ALGORITHMS")
                .value_name("ALGS")
                .help("Comma separated algorithms accepted on verification")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("token-leeway")
                .long("token-leeway")
                .env("USERBASE_TOKEN_LEEWAY")
                .value_name("DURATION")
                .default_value("0s"),
        )
        .arg(
            Arg::new("hash-salt")
                .long("hash-salt")
                .env("USERBASE_HASH_SALT")
                .default_value("salt")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("hash-iterations")
                .long("hash-iterations")
                .env("USERBASE_HASH_ITERATIONS")
                .value_parser(value_parser!(u32))
                .default_value("100000"),
        )
        .arg(
            Arg::new("hash-key-length")
                .long("hash-key-length")
                .env("USERBASE_HASH_KEY_LENGTH")
                .value_parser(value_parser!(usize))
                .default_value("64"),
        )
        .arg(
            Arg::new("hash-digest")
                .long("hash-digest")
                .env("USERBASE_HASH_DIGEST")
                .value_parser(["sha256", "sha512"])
                .default_value("sha512"),
        )
}

impl ServerConfig {
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let bind = required(matches, "bind")?
            .parse::<SocketAddr>()
            .context("invalid bind address")?;
        let data_dir = PathBuf::from(required(matches, "data-dir")?);
        let log_format = match required(matches, "log-format")? {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let encryption = EncryptionConfig {
            salt: required(matches, "hash-salt")?.to_string(),
            iterations: *matches
                .get_one::<u32>("hash-iterations")
                .ok_or_else(|| anyhow!("missing hash-iterations"))?,
            key_length: *matches
                .get_one::<usize>("hash-key-length")
                .ok_or_else(|| anyhow!("missing hash-key-length"))?,
            digest: required(matches, "hash-digest")?.parse::<DigestAlgorithm>()?,
        };

        let (secret, ephemeral_secret) = match matches.get_one::<String>("token-secret") {
            Some(secret) if !secret.is_empty() => (SigningSecret::new(secret.as_bytes()), false),
            _ => (ephemeral_secret(), true),
        };

        let algorithm = required(matches, "token-algorithm")?.parse::<TokenAlgorithm>()?;
        let allowed_algorithms = match matches.get_many::<String>("token-allowed-algorithms") {
            Some(values) => values
                .map(|v| v.trim().parse::<TokenAlgorithm>())
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![algorithm],
        };

        let token = TokenConfig {
            secret,
            expiration: parse_duration(required(matches, "token-expiration")?)?,
            audience: required(matches, "token-audience")?.to_string(),
            issuer: required(matches, "token-issuer")?.to_string(),
            algorithm,
            allowed_algorithms,
            leeway: parse_duration(required(matches, "token-leeway")?)?,
        };

        let auth = AuthConfig::new(encryption, token).context("invalid auth configuration")?;

        Ok(ServerConfig {
            bind,
            data_dir,
            in_memory: matches.get_flag("in-memory"),
            log_format,
            auth,
            ephemeral_secret,
        })
    }

    /// Parse the process arguments and environment
    pub fn load() -> anyhow::Result<Self> {
        Self::from_matches(&command().get_matches())
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing {}", name))
}

fn ephemeral_secret() -> SigningSecret {
    let mut bytes = vec![0u8; EPHEMERAL_SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    SigningSecret::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SECRET: &str = "a-strong-enough-signing-secret";

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec!["userbase-server"];
        argv.extend_from_slice(args);
        ServerConfig::from_matches(&command().try_get_matches_from(argv)?)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--token-secret", SECRET]).unwrap();

        assert_eq!(config.bind, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert!(!config.in_memory);
        assert!(!config.ephemeral_secret);
        assert_eq!(config.auth.encryption, EncryptionConfig::default());
        assert_eq!(config.auth.token.expiration, Duration::from_secs(4 * 60 * 60));
        assert_eq!(config.auth.token.audience, "urn:api:client");
        assert_eq!(config.auth.token.allowed_algorithms, vec![TokenAlgorithm::HS256]);
        assert_eq!(config.auth.token.secret.as_bytes(), SECRET.as_bytes());
    }

    #[test]
    fn test_missing_secret_is_generated() {
        let config = parse(&["--in-memory"]).unwrap();
        assert!(config.ephemeral_secret);
        assert_eq!(config.auth.token.secret.as_bytes().len(), EPHEMERAL_SECRET_LEN);
    }

    #[test]
    fn test_algorithm_overrides() {
        let config = parse(&[
            "--token-secret",
            SECRET,
            "--token-algorithm",
            "HS512",
            "--token-allowed-algorithms",
            "HS256,HS512",
            "--token-expiration",
            "30m",
        ])
        .unwrap();

        assert_eq!(config.auth.token.algorithm, TokenAlgorithm::HS512);
        assert_eq!(
            config.auth.token.allowed_algorithms,
            vec![TokenAlgorithm::HS256, TokenAlgorithm::HS512]
        );
        assert_eq!(config.auth.token.expiration, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_signing_algorithm_must_be_allowed() {
        let result = parse(&[
            "--token-secret",
            SECRET,
            "--token-algorithm",
            "HS384",
            "--token-allowed-algorithms",
            "HS256",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        assert!(parse(&["--token-secret", SECRET, "--token-expiration", "soon"]).is_err());
    }

    #[test]
    fn test_short_secret_is_rejected() {
        assert!(parse(&["--token-secret", "mpp7094"]).is_err());
        assert!(parse(&["--token-secret", SECRET, "--token-expiration", "500ms"]).is_err());
    }
}
