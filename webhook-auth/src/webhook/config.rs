//! Verifier configuration.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretVec};
use serde::{Deserialize, Serialize};

use super::result::HeaderKind;
use crate::error::{config_error, ConfigErrorKind, Error};

pub const DEFAULT_TIMESTAMP_HEADER: &str = "X-Swish-Timestamp";
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Swish-Signature";
pub const DEFAULT_NONCE_HEADER: &str = "X-Swish-Nonce";

/// Longest skew, maximum age, nonce TTL, or store timeout accepted (7 days).
pub const MAX_CONFIGURED_DURATION_SECS: i64 = 7 * 24 * 60 * 60;

const DEFAULT_SKEW_MINUTES: i64 = 5;
const DEFAULT_MAX_AGE_MINUTES: i64 = 10;
const DEFAULT_STORE_TIMEOUT_MS: i64 = 2_000;

/// Whether deliveries must carry a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoncePolicy {
    /// A nonce must be present and is reserved after the signature checks out.
    #[default]
    Required,
    /// A nonce is signed and reserved when present; its absence is tolerated.
    Optional,
    /// The nonce header is ignored and the canonical nonce slot is empty.
    Disabled,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NoncePolicyParseError;

impl FromStr for NoncePolicy {
    type Err = NoncePolicyParseError;
    fn from_str(policy: &str) -> Result<NoncePolicy, Self::Err> {
        match policy.to_lowercase().as_str() {
            "required" => Ok(NoncePolicy::Required),
            "optional" => Ok(NoncePolicy::Optional),
            "disabled" => Ok(NoncePolicy::Disabled),
            _ => Err(NoncePolicyParseError),
        }
    }
}

impl fmt::Display for NoncePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NoncePolicy::Required => write!(f, "required"),
            NoncePolicy::Optional => write!(f, "optional"),
            NoncePolicy::Disabled => write!(f, "disabled"),
        }
    }
}

/// A canonical header name plus the legacy aliases folded into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderName {
    pub canonical: String,
    pub aliases: Vec<String>,
}

impl HeaderName {
    pub fn new(canonical: &str, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Returns 0 for the canonical name, 1.. for aliases in declaration order,
    /// or `None` if `name` is not recognized. Comparison ignores ASCII case.
    pub(crate) fn rank(&self, name: &str) -> Option<usize> {
        if self.canonical.eq_ignore_ascii_case(name) {
            return Some(0);
        }
        self.aliases
            .iter()
            .position(|alias| alias.eq_ignore_ascii_case(name))
            .map(|index| index + 1)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// The recognized header names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderNames {
    pub timestamp: HeaderName,
    pub signature: HeaderName,
    pub nonce: HeaderName,
}

impl HeaderNames {
    pub fn get(&self, kind: HeaderKind) -> &HeaderName {
        match kind {
            HeaderKind::Timestamp => &self.timestamp,
            HeaderKind::Signature => &self.signature,
            HeaderKind::Nonce => &self.nonce,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        let all: Vec<&str> = [&self.timestamp, &self.signature, &self.nonce]
            .into_iter()
            .flat_map(HeaderName::names)
            .collect();

        if all.iter().any(|name| name.trim().is_empty()) {
            return Err(config_error(
                ConfigErrorKind::InvalidHeaderName,
                "Header names must not be blank",
            ));
        }

        for (i, a) in all.iter().enumerate() {
            if all[i + 1..].iter().any(|b| a.eq_ignore_ascii_case(b)) {
                return Err(config_error(
                    ConfigErrorKind::InvalidHeaderName,
                    &format!("Header name {} is configured more than once", a),
                ));
            }
        }

        Ok(())
    }
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            timestamp: HeaderName::new(DEFAULT_TIMESTAMP_HEADER, &["X-Timestamp"]),
            signature: HeaderName::new(DEFAULT_SIGNATURE_HEADER, &["X-Signature"]),
            nonce: HeaderName::new(DEFAULT_NONCE_HEADER, &["X-Nonce"]),
        }
    }
}

/// Verifier configuration. Construct through [`VerifierConfig::builder`].
pub struct VerifierConfig {
    secret: SecretVec<u8>,
    allowed_skew: Duration,
    max_age: Option<Duration>,
    nonce_policy: NoncePolicy,
    nonce_ttl: Option<Duration>,
    store_timeout: Duration,
    header_names: HeaderNames,
}

impl VerifierConfig {
    /// Start building a configuration around the shared secret.
    pub fn builder(secret: impl Into<Vec<u8>>) -> VerifierConfigBuilder {
        VerifierConfigBuilder {
            secret: secret.into(),
            allowed_skew: Duration::minutes(DEFAULT_SKEW_MINUTES),
            max_age: Some(Duration::minutes(DEFAULT_MAX_AGE_MINUTES)),
            nonce_policy: NoncePolicy::default(),
            nonce_ttl: None,
            store_timeout: Duration::milliseconds(DEFAULT_STORE_TIMEOUT_MS),
            header_names: HeaderNames::default(),
        }
    }

    pub(crate) fn secret(&self) -> &[u8] {
        self.secret.expose_secret()
    }

    pub fn allowed_skew(&self) -> Duration {
        self.allowed_skew
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn nonce_policy(&self) -> NoncePolicy {
        self.nonce_policy
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn header_names(&self) -> &HeaderNames {
        &self.header_names
    }

    /// How long a reserved nonce is remembered.
    ///
    /// Defaults to the longest time a message carrying the nonce can still pass
    /// the timestamp check: a sender may be up to `skew` ahead, and the message
    /// stays acceptable until it is `min(skew, max_age)` old.
    pub fn nonce_ttl(&self) -> Duration {
        let ttl = self.nonce_ttl.unwrap_or_else(|| {
            let past_window = match self.max_age {
                Some(max_age) => max_age.min(self.allowed_skew),
                None => self.allowed_skew,
            };
            self.allowed_skew + past_window
        });
        ttl.max(Duration::seconds(1))
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("secret", &"[REDACTED]")
            .field("allowed_skew", &self.allowed_skew)
            .field("max_age", &self.max_age)
            .field("nonce_policy", &self.nonce_policy)
            .field("nonce_ttl", &self.nonce_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("header_names", &self.header_names)
            .finish()
    }
}

/// Builder for [`VerifierConfig`].
pub struct VerifierConfigBuilder {
    secret: Vec<u8>,
    allowed_skew: Duration,
    max_age: Option<Duration>,
    nonce_policy: NoncePolicy,
    nonce_ttl: Option<Duration>,
    store_timeout: Duration,
    header_names: HeaderNames,
}

impl VerifierConfigBuilder {
    /// Symmetric tolerance between the declared send time and now.
    pub fn allowed_skew(mut self, skew: Duration) -> Self {
        self.allowed_skew = skew;
        self
    }

    /// Upper bound on message age, independent of skew. `None` disables it.
    pub fn max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn nonce_policy(mut self, policy: NoncePolicy) -> Self {
        self.nonce_policy = policy;
        self
    }

    /// Overrides the computed nonce retention period.
    pub fn nonce_ttl(mut self, ttl: Duration) -> Self {
        self.nonce_ttl = Some(ttl);
        self
    }

    /// Upper bound on a single nonce reservation round trip.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn header_names(mut self, names: HeaderNames) -> Self {
        self.header_names = names;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<VerifierConfig, Error> {
        if self.secret.is_empty() {
            return Err(config_error(
                ConfigErrorKind::EmptySecret,
                "Shared secret must not be empty",
            ));
        }
        if self.allowed_skew < Duration::zero() {
            return Err(config_error(
                ConfigErrorKind::NegativeSkew,
                "Allowed clock skew must not be negative",
            ));
        }
        if self.max_age.is_some_and(|age| age < Duration::zero()) {
            return Err(config_error(
                ConfigErrorKind::NegativeMaxAge,
                "Maximum message age must not be negative",
            ));
        }
        if self.nonce_ttl.is_some_and(|ttl| ttl < Duration::zero()) {
            return Err(config_error(
                ConfigErrorKind::NegativeNonceTtl,
                "Nonce TTL must not be negative",
            ));
        }
        let longest = Duration::seconds(MAX_CONFIGURED_DURATION_SECS);
        let too_long = self.allowed_skew > longest
            || self.max_age.is_some_and(|age| age > longest)
            || self.nonce_ttl.is_some_and(|ttl| ttl > longest)
            || self.store_timeout > longest;
        if too_long {
            return Err(config_error(
                ConfigErrorKind::DurationTooLong,
                "Durations must not exceed 7 days",
            ));
        }
        if self.store_timeout <= Duration::zero() || self.store_timeout.to_std().is_err() {
            return Err(config_error(
                ConfigErrorKind::InvalidStoreTimeout,
                "Store timeout must be positive",
            ));
        }
        self.header_names.validate()?;

        Ok(VerifierConfig {
            secret: SecretVec::new(self.secret),
            allowed_skew: self.allowed_skew,
            max_age: self.max_age,
            nonce_policy: self.nonce_policy,
            nonce_ttl: self.nonce_ttl,
            store_timeout: self.store_timeout,
            header_names: self.header_names,
        })
    }
}
