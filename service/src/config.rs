use clap::builder::TypedValueParser as _;
use clap::Parser;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use webhook_auth::webhook::NoncePolicy;

/// Default Redis endpoint used when `REDIS_URL` is not set.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default namespace for nonce keys in Redis.
pub const DEFAULT_NONCE_KEY_PREFIX: &str = "swish:nonce:";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Where consumed nonces are recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NonceBackend {
    /// Process-local map. Single-instance deployments only.
    Memory,
    /// Shared Redis instance.
    Redis,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NonceBackendParseError;

impl FromStr for NonceBackend {
    type Err = NonceBackendParseError;
    fn from_str(backend: &str) -> Result<NonceBackend, Self::Err> {
        match backend.to_lowercase().as_str() {
            "memory" => Ok(NonceBackend::Memory),
            "redis" => Ok(NonceBackend::Redis),
            _ => Err(NonceBackendParseError),
        }
    }
}

impl fmt::Display for NonceBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NonceBackend::Memory => write!(f, "memory"),
            NonceBackend::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The shared secret the payment provider signs webhooks with.
    #[arg(long, env, hide_env_values = true)]
    webhook_secret: Option<String>,

    /// Tolerated difference in seconds between the sender's timestamp and our clock,
    /// in either direction.
    #[arg(long, env, default_value_t = 300)]
    pub allowed_skew_secs: u64,

    /// Maximum age in seconds of an accepted message, independent of the skew.
    #[arg(long, env, default_value_t = 600)]
    pub max_message_age_secs: u64,

    /// Disable the maximum message age check and rely on the skew alone.
    #[arg(long, env, default_value_t = false)]
    pub no_max_message_age: bool,

    /// Whether deliveries must carry a nonce header.
    #[arg(
        long,
        env,
        default_value_t = NoncePolicy::Required,
        value_parser = clap::builder::PossibleValuesParser::new([
            "REQUIRED", "OPTIONAL", "DISABLED",
            "required", "optional", "disabled"
        ])
            .map(|s| s.parse::<NoncePolicy>().unwrap()),
        )]
    pub nonce_policy: NoncePolicy,

    /// Where consumed nonces are recorded.
    #[arg(
        long,
        env,
        default_value_t = NonceBackend::Memory,
        value_parser = clap::builder::PossibleValuesParser::new([
            "MEMORY", "REDIS", "memory", "redis"
        ])
            .map(|s| s.parse::<NonceBackend>().unwrap()),
        )]
    pub nonce_backend: NonceBackend,

    /// The Redis URL to record nonces in when the redis backend is selected.
    #[arg(long, env, default_value = DEFAULT_REDIS_URL)]
    redis_url: String,

    /// Key prefix for nonces stored in Redis.
    #[arg(long, env, default_value = DEFAULT_NONCE_KEY_PREFIX)]
    nonce_key_prefix: String,

    /// Milliseconds to wait for the nonce store before rejecting a delivery.
    #[arg(long, env, default_value_t = 2000)]
    pub store_timeout_ms: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Config {
    /// Returns the webhook signing secret, if configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref()
    }

    /// Returns the maximum message age, or `None` when the check is disabled.
    pub fn max_message_age_secs(&self) -> Option<u64> {
        if self.no_max_message_age {
            None
        } else {
            Some(self.max_message_age_secs)
        }
    }

    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }

    pub fn nonce_key_prefix(&self) -> &str {
        &self.nonce_key_prefix
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["webhook_guard"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--webhook-secret", "dev_secret"]);
        assert_eq!(config.webhook_secret(), Some("dev_secret"));
        assert_eq!(config.allowed_skew_secs, 300);
        assert_eq!(config.max_message_age_secs(), Some(600));
        assert_eq!(config.nonce_policy, NoncePolicy::Required);
        assert_eq!(config.nonce_backend, NonceBackend::Memory);
        assert_eq!(config.nonce_key_prefix(), "swish:nonce:");
        assert_eq!(config.store_timeout_ms, 2000);
        assert_eq!(config.runtime_env(), RustEnv::Development);
    }

    #[test]
    fn test_backend_and_policy_are_case_insensitive() {
        let config = parse(&[
            "--nonce-backend",
            "REDIS",
            "--nonce-policy",
            "optional",
            "--redis-url",
            "redis://cache:6379",
        ]);
        assert_eq!(config.nonce_backend, NonceBackend::Redis);
        assert_eq!(config.nonce_policy, NoncePolicy::Optional);
        assert_eq!(config.redis_url(), "redis://cache:6379");
    }

    #[test]
    fn test_max_age_can_be_disabled() {
        let config = parse(&["--no-max-message-age"]);
        assert_eq!(config.max_message_age_secs(), None);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Config::try_parse_from(["webhook_guard", "--nonce-backend", "etcd"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_nonce_backend_from_str() {
        assert_eq!("Memory".parse::<NonceBackend>(), Ok(NonceBackend::Memory));
        assert_eq!("redis".parse::<NonceBackend>(), Ok(NonceBackend::Redis));
        assert_eq!("disk".parse::<NonceBackend>(), Err(NonceBackendParseError));
    }
}
