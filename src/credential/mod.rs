use std::collections::HashMap;
use std::fmt;
use std::fs::read_to_string;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{AmpErr, Result};

pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
pub const EXPIRATION_ENV: &str = "AWS_CREDENTIAL_EXPIRATION";
pub const PROFILE_ENV: &str = "AWS_PROFILE";
pub const SHARED_CREDENTIALS_FILE_ENV: &str = "AWS_SHARED_CREDENTIALS_FILE";
pub const DEFAULT_PROFILE: &str = "default";

/// Frozen snapshot of a cloud identity, valid for one signed request.
#[derive(Clone, PartialEq)]
pub struct Credential {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    expiry: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_key: &str, secret_key: &str) -> Credential {
        Credential {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            session_token: None,
            expiry: None,
        }
    }

    pub fn with_session_token(mut self, token: &str) -> Credential {
        self.session_token = Some(token.to_string());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Credential {
        self.expiry = Some(expiry);
        self
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }
}

// Secrets never reach log output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.access_key.chars().take(4).collect();
        f.debug_struct("Credential")
            .field("access_key", &format!("{}****", prefix))
            .field("secret_key", &"****")
            .field("session_token", &self.session_token.as_ref().map(|_| "****"))
            .field("expiry", &self.expiry)
            .finish()
    }
}

///
/// CredentialSource hands out a fresh credential snapshot for every signed call,
/// so rotated session tokens are picked up without restarting the client.
pub trait CredentialSource: Send + Sync {
    fn get(&self) -> Result<Credential>;

    fn name(&self) -> &'static str;
}

/// Fixed credential, for explicit keys and tests.
pub struct StaticCredentialSource {
    credential: Credential,
}

impl StaticCredentialSource {
    pub fn new(credential: Credential) -> StaticCredentialSource {
        StaticCredentialSource { credential }
    }
}

impl CredentialSource for StaticCredentialSource {
    fn get(&self) -> Result<Credential> {
        check_not_expired(self.credential.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Credential from the standard `AWS_*` environment variables.
pub struct EnvCredentialSource {
    lookup: EnvLookup,
}

impl EnvCredentialSource {
    pub fn new() -> EnvCredentialSource {
        EnvCredentialSource { lookup: Box::new(|key| std::env::var(key).ok()) }
    }

    pub fn with_lookup<F>(lookup: F) -> EnvCredentialSource
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        EnvCredentialSource { lookup: Box::new(lookup) }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        EnvCredentialSource::new()
    }
}

impl CredentialSource for EnvCredentialSource {
    fn get(&self) -> Result<Credential> {
        let access_key = self
            .var(ACCESS_KEY_ENV)
            .ok_or_else(|| AmpErr::CredentialUnavailable(format!("{} is not set", ACCESS_KEY_ENV)))?;
        let secret_key = self
            .var(SECRET_KEY_ENV)
            .ok_or_else(|| AmpErr::CredentialUnavailable(format!("{} is not set", SECRET_KEY_ENV)))?;
        let mut credential = Credential::new(&access_key, &secret_key);
        if let Some(token) = self.var(SESSION_TOKEN_ENV) {
            credential = credential.with_session_token(&token);
        }
        if let Some(expiration) = self.var(EXPIRATION_ENV) {
            let expiry = DateTime::parse_from_rfc3339(expiration.trim()).map_err(|e| {
                AmpErr::CredentialUnavailable(format!("invalid {}: {}", EXPIRATION_ENV, e))
            })?;
            credential = credential.with_expiry(expiry.with_timezone(&Utc));
        }
        check_not_expired(credential)
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

/// Credential from a profile of the shared credentials file.
pub struct ProfileCredentialSource {
    path: PathBuf,
    profile: String,
}

impl ProfileCredentialSource {
    pub fn new(path: PathBuf, profile: &str) -> ProfileCredentialSource {
        ProfileCredentialSource { path, profile: profile.to_string() }
    }

    /// Location and profile as resolved from `AWS_SHARED_CREDENTIALS_FILE`, `HOME` and `AWS_PROFILE`.
    pub fn from_env() -> Option<ProfileCredentialSource> {
        let path = match std::env::var(SHARED_CREDENTIALS_FILE_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => PathBuf::from(std::env::var("HOME").ok()?).join(".aws").join("credentials"),
        };
        let profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
        Some(ProfileCredentialSource::new(path, &profile))
    }
}

impl CredentialSource for ProfileCredentialSource {
    fn get(&self) -> Result<Credential> {
        let content = read_to_string(&self.path).map_err(|e| {
            AmpErr::CredentialUnavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let profiles = parse_profiles(&content);
        let entries = profiles.get(&self.profile).ok_or_else(|| {
            AmpErr::CredentialUnavailable(format!(
                "profile {} not found in {}",
                self.profile,
                self.path.display()
            ))
        })?;
        let field = |key: &str| -> Result<&String> {
            entries.get(key).filter(|v| !v.is_empty()).ok_or_else(|| {
                AmpErr::CredentialUnavailable(format!("profile {} has no {}", self.profile, key))
            })
        };
        let mut credential =
            Credential::new(field("aws_access_key_id")?, field("aws_secret_access_key")?);
        if let Some(token) = entries.get("aws_session_token").filter(|v| !v.is_empty()) {
            credential = credential.with_session_token(token);
        }
        Ok(credential)
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}

/// Tries each source in turn, first success wins.
pub struct ChainCredentialSource {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl ChainCredentialSource {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> ChainCredentialSource {
        ChainCredentialSource { sources }
    }

    /// Environment first, then the shared credentials file.
    pub fn default_chain() -> ChainCredentialSource {
        let mut sources: Vec<Box<dyn CredentialSource>> = vec![Box::new(EnvCredentialSource::new())];
        if let Some(profile) = ProfileCredentialSource::from_env() {
            sources.push(Box::new(profile));
        }
        ChainCredentialSource::new(sources)
    }
}

impl CredentialSource for ChainCredentialSource {
    fn get(&self) -> Result<Credential> {
        let mut reasons = Vec::with_capacity(self.sources.len());
        for source in self.sources.iter() {
            match source.get() {
                Ok(credential) => {
                    debug!("resolved credential from {} source", source.name());
                    return Ok(credential);
                }
                Err(e) => reasons.push(format!("{}: {}", source.name(), e)),
            }
        }
        if reasons.is_empty() {
            reasons.push("no credential source configured".to_string());
        }
        Err(AmpErr::CredentialUnavailable(reasons.join("; ")))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

fn check_not_expired(credential: Credential) -> Result<Credential> {
    if credential.is_expired_at(Utc::now()) {
        return Err(AmpErr::CredentialUnavailable("session expired".to_string()));
    }
    Ok(credential)
}

// `[profile]` sections of `key = value` lines; `#` and `;` start comments.
fn parse_profiles(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut profiles: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            let name = line[1..line.len() - 1].trim();
            let name = name.strip_prefix("profile ").unwrap_or(name).trim().to_string();
            profiles.entry(name.clone()).or_insert_with(HashMap::new);
            current = Some(name);
            continue;
        }
        if let (Some(profile), Some(idx)) = (current.as_ref(), line.find('=')) {
            let key = line[..idx].trim().to_lowercase();
            let value = line[idx + 1..].trim().to_string();
            if let Some(entries) = profiles.get_mut(profile) {
                entries.insert(key, value);
            }
        }
    }
    profiles
}
