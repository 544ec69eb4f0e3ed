//! Repository configuration
//!
//! A plain value passed into the repository at construction. The on-disk
//! format is the minimal subset of the usual INI dialect:
//!
//! ```text
//! # comment
//! [user]
//!     name = Ada Lovelace
//!     email = ada@example.com
//! ```
//!
//! Section and key names are case-insensitive and stored lowercased.

use crate::artifacts::core::write_atomically;
use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const AUTHOR_NAME_ENV: &str = "CAIRN_AUTHOR_NAME";
pub const AUTHOR_EMAIL_ENV: &str = "CAIRN_AUTHOR_EMAIL";
pub const AUTHOR_DATE_ENV: &str = "CAIRN_AUTHOR_DATE";

pub const DEFAULT_BRANCH: &str = "master";

const AUTHOR_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
    author_date: Option<DateTime<FixedOffset>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a config file; a missing file is an empty config
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut section = None::<String>;

        for (number, line) in content.lines().enumerate() {
            let line = match line.find(['#', ';']) {
                Some(comment) => &line[..comment],
                None => line,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                if name.is_empty() {
                    return Err(Error::invalid(format!(
                        "empty section name on config line {}",
                        number + 1
                    )));
                }
                section = Some(name.to_lowercase());
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                Error::invalid(format!("expected `key = value` on config line {}", number + 1))
            })?;
            let section = section.as_deref().ok_or_else(|| {
                Error::invalid(format!("config line {} is outside a section", number + 1))
            })?;

            config.set(section, key.trim(), value.trim());
        }

        Ok(config)
    }

    /// Write the config back, grouped by section
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomically(path, self.to_string().as_bytes())?;
        debug!(path = %path.display(), "config saved");

        Ok(())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.values
            .get(&Self::normalize_key(section, key))
            .map(String::as_str)
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.values
            .insert(Self::normalize_key(section, key), value.into());
    }

    pub fn unset(&mut self, section: &str, key: &str) -> Option<String> {
        self.values.remove(&Self::normalize_key(section, key))
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        self.get(section, key)
            .map(|value| matches!(value.to_lowercase().as_str(), "true" | "yes" | "on" | "1"))
    }

    pub fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        self.get(section, key).and_then(|value| value.parse().ok())
    }

    pub fn user_name(&self) -> Option<&str> {
        self.get("user", "name")
    }

    pub fn user_email(&self) -> Option<&str> {
        self.get("user", "email")
    }

    pub fn default_branch(&self) -> &str {
        self.get("init", "defaultbranch").unwrap_or(DEFAULT_BRANCH)
    }

    /// zlib level for loose objects, clamped to `0..=9`
    pub fn compression_level(&self) -> flate2::Compression {
        match self.get_int("core", "compression") {
            Some(level) => flate2::Compression::new(level.clamp(0, 9) as u32),
            None => flate2::Compression::default(),
        }
    }

    /// Pinned timestamp for identities built from this config
    pub fn author_date(&self) -> Option<DateTime<FixedOffset>> {
        self.author_date
    }

    pub fn with_author_date(mut self, author_date: DateTime<FixedOffset>) -> Self {
        self.author_date = Some(author_date);
        self
    }

    /// Overlay the identity found in `CAIRN_AUTHOR_*` environment variables
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(name) = std::env::var(AUTHOR_NAME_ENV) {
            self.set("user", "name", name);
        }
        if let Ok(email) = std::env::var(AUTHOR_EMAIL_ENV) {
            self.set("user", "email", email);
        }
        if let Ok(date) = std::env::var(AUTHOR_DATE_ENV) {
            self.author_date = Some(Self::parse_author_date(&date)?);
        }

        Ok(self)
    }

    /// Accepts RFC 2822 or `YYYY-MM-DD HH:MM:SS +hhmm`
    pub fn parse_author_date(value: &str) -> Result<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc2822(value)
            .or_else(|_| DateTime::parse_from_str(value, AUTHOR_DATE_FORMAT))
            .map_err(|_| Error::invalid(format!("invalid author date {value:?}")))
    }

    /// Copy every value of `other` over this config
    pub fn merge(&mut self, other: &Config) {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        if other.author_date.is_some() {
            self.author_date = other.author_date;
        }
    }

    fn normalize_key(section: &str, key: &str) -> String {
        format!("{}.{}", section.to_lowercase(), key.to_lowercase())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut current = None;

        for (full_key, value) in &self.values {
            let Some((section, key)) = full_key.rsplit_once('.') else {
                continue;
            };

            if current != Some(section) {
                if current.is_some() {
                    writeln!(f)?;
                }
                writeln!(f, "[{section}]")?;
                current = Some(section);
            }
            writeln!(f, "\t{key} = {value}")?;
        }

        Ok(())
    }
}
