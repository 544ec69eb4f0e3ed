//! Author, committer and tagger identities
//!
//! Serialized as `<name> <<email>> <unix-seconds> <+hhmm>`, e.g.
//! `Ada Lovelace <ada@example.com> 1700000000 +0130`.

use crate::areas::config::Config;
use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Person {
    name: String,
    email: String,
    timestamp: DateTime<FixedOffset>,
}

/// Characters that would break the `name <email>` framing of a person line
const FORBIDDEN_IDENTITY_CHARS: [char; 3] = ['<', '>', '\n'];

impl Person {
    /// Create a person stamped with the current local time
    pub fn new(name: String, email: String) -> Result<Self> {
        Self::new_with_timestamp(name, email, chrono::Local::now().fixed_offset())
    }

    /// Fails with `InvalidArgument` when the name or email contains `<`, `>`
    /// or a newline, since the person line could not be parsed back
    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<Self> {
        for (field, value) in [("name", &name), ("email", &email)] {
            if value.contains(FORBIDDEN_IDENTITY_CHARS) {
                return Err(Error::invalid(format!(
                    "identity {field} {value:?} may not contain '<', '>' or a newline"
                )));
            }
        }

        Ok(Person {
            name,
            email,
            timestamp,
        })
    }

    /// Build the configured identity
    ///
    /// Uses `user.name` and `user.email`; the timestamp is the configured
    /// author date when one is pinned, otherwise now.
    pub fn from_config(config: &Config) -> Result<Self> {
        let name = config
            .user_name()
            .ok_or_else(|| Error::invalid("user.name is not configured"))?;
        let email = config
            .user_email()
            .ok_or_else(|| Error::invalid("user.email is not configured"))?;

        match config.author_date() {
            Some(timestamp) => Self::new_with_timestamp(name.to_string(), email.to_string(), timestamp),
            None => Self::new(name.to_string(), email.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Human-readable timestamp like "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }
}

impl std::fmt::Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }
}

impl TryFrom<&str> for Person {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        // split from the right: timezone, timestamp, then "name <email>"
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(Error::corrupt(format!("invalid person line {value:?}")));
        }

        let offset = parse_offset(parts[0])?;
        let seconds = parts[1]
            .parse::<i64>()
            .map_err(|_| Error::corrupt(format!("invalid timestamp {:?}", parts[1])))?;
        let name_email = parts[2];

        let email_start = name_email
            .find('<')
            .ok_or_else(|| Error::corrupt(format!("missing '<' in {name_email:?}")))?;
        let email_end = name_email
            .rfind('>')
            .filter(|end| *end > email_start)
            .ok_or_else(|| Error::corrupt(format!("missing '>' in {name_email:?}")))?;

        let name = &name_email[..email_start];
        let name = name.strip_suffix(' ').unwrap_or(name).to_string();
        let email = name_email[email_start + 1..email_end].to_string();

        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| Error::corrupt(format!("timestamp {seconds} out of range")))?
            .with_timezone(&offset);

        Ok(Person {
            name,
            email,
            timestamp,
        })
    }
}

/// Parse a `+hhmm` / `-hhmm` offset
fn parse_offset(value: &str) -> Result<FixedOffset> {
    let invalid = || Error::corrupt(format!("invalid timezone {value:?}"));

    if value.len() != 5 || !value.is_ascii() {
        return Err(invalid());
    }

    let sign = match &value[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(invalid()),
    };
    let hours = value[1..3].parse::<i32>().map_err(|_| invalid())?;
    let minutes = value[3..5].parse::<i32>().map_err(|_| invalid())?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
