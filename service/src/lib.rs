use config::{Config, NonceBackend, RustEnv};
use log::{info, warn};
use std::sync::Arc;
use webhook_auth::error::{config_error, ConfigErrorKind};
use webhook_auth::nonce::{InMemoryNonceStore, NonceStore, RedisNonceStore};
use webhook_auth::{Error, Verifier, VerifierConfig};

pub mod config;
pub mod logging;

fn duration(value: std::time::Duration, message: &str) -> Result<chrono::Duration, Error> {
    chrono::Duration::from_std(value)
        .map_err(|_| config_error(ConfigErrorKind::DurationTooLong, message))
}

/// Builds the verifier settings from the command line and environment.
pub fn verifier_config(config: &Config) -> Result<VerifierConfig, Error> {
    let secret = config.webhook_secret().unwrap_or_default();

    let allowed_skew = duration(
        std::time::Duration::from_secs(config.allowed_skew_secs),
        "Allowed clock skew is out of range",
    )?;
    let max_age = config
        .max_message_age_secs()
        .map(|secs| {
            duration(
                std::time::Duration::from_secs(secs),
                "Maximum message age is out of range",
            )
        })
        .transpose()?;
    let store_timeout = duration(
        std::time::Duration::from_millis(config.store_timeout_ms),
        "Store timeout is out of range",
    )?;

    VerifierConfig::builder(secret.as_bytes())
        .allowed_skew(allowed_skew)
        .max_age(max_age)
        .nonce_policy(config.nonce_policy)
        .store_timeout(store_timeout)
        .build()
}

/// Opens the nonce store selected by `--nonce-backend`.
pub fn build_nonce_store(config: &Config) -> Result<Arc<dyn NonceStore>, Error> {
    match config.nonce_backend {
        NonceBackend::Memory => {
            if config.runtime_env() != RustEnv::Development {
                warn!(
                    "In-memory nonce store in {} only detects replays within this process",
                    config.runtime_env()
                );
            }
            Ok(Arc::new(InMemoryNonceStore::new()))
        }
        NonceBackend::Redis => {
            info!(
                "Using Redis nonce store with key prefix [{}]",
                config.nonce_key_prefix()
            );
            let store = RedisNonceStore::new(config.redis_url(), config.nonce_key_prefix())?;
            Ok(Arc::new(store))
        }
    }
}

/// Assembles a verifier and its nonce store from configuration.
pub fn build_verifier(config: &Config) -> Result<Verifier, Error> {
    let verifier_config = verifier_config(config)?;
    let store = build_nonce_store(config)?;
    info!(
        "Webhook verifier ready: skew={}s max_age={:?} nonce_policy={} backend={}",
        verifier_config.allowed_skew().num_seconds(),
        verifier_config.max_age().map(|age| age.num_seconds()),
        verifier_config.nonce_policy(),
        config.nonce_backend,
    );
    Ok(Verifier::new(verifier_config, store))
}
