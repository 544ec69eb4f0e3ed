//! Reference change-log records
//!
//! Each line records one transition of a reference:
//!
//! ```text
//! <new-hex> <old-hex> <name> <<email>> <unix-seconds> <+hhmm>\t<message>
//! ```
//!
//! An absent side (creation or deletion) is written as 40 zeros.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::person::Person;
use crate::errors::{Error, Result};
use derive_new::new;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ReflogEntry {
    pub new_oid: Option<ObjectId>,
    pub old_oid: Option<ObjectId>,
    pub identity: Person,
    pub message: String,
}

impl ReflogEntry {
    /// Render the entry as one newline-terminated log line
    pub fn to_line(&self) -> String {
        let side = |oid: Option<ObjectId>| oid.unwrap_or_else(ObjectId::zero);
        let message = self.message.replace('\n', " ");

        format!(
            "{} {} {}\t{}\n",
            side(self.new_oid),
            side(self.old_oid),
            self.identity,
            message.trim_end()
        )
    }
}

impl TryFrom<&str> for ReflogEntry {
    type Error = Error;

    fn try_from(line: &str) -> Result<Self> {
        let line = line.trim_end_matches('\n');
        let (head, message) = line
            .split_once('\t')
            .ok_or_else(|| Error::corrupt(format!("reflog line without message: {line:?}")))?;

        let mut parts = head.splitn(3, ' ');
        let (Some(new), Some(old), Some(identity)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::corrupt(format!("truncated reflog line: {line:?}")));
        };

        let side = |hex: &str| -> Result<Option<ObjectId>> {
            let oid = ObjectId::try_parse(hex)
                .map_err(|_| Error::corrupt(format!("invalid reflog object id {hex:?}")))?;
            Ok((oid != ObjectId::zero()).then_some(oid))
        };

        Ok(ReflogEntry {
            new_oid: side(new)?,
            old_oid: side(old)?,
            identity: Person::try_from(identity)?,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn identity() -> Person {
        Person::new_with_timestamp(
            "Ada Lovelace".to_string(),
            "ada@example.com".to_string(),
            DateTime::parse_from_rfc3339("2023-11-14T22:13:20+01:30").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn creation_is_logged_with_a_zero_old_side() {
        let new = ObjectId::try_parse("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        let entry = ReflogEntry::new(Some(new), None, identity(), "branch: created".into());

        assert_eq!(
            entry.to_line(),
            "ce013625030ba8dba906f756967f9e9ca394464a \
             0000000000000000000000000000000000000000 \
             Ada Lovelace <ada@example.com> 1699994600 +0130\tbranch: created\n"
        );
    }

    #[test]
    fn lines_parse_back() {
        let old = ObjectId::try_parse("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        let entry = ReflogEntry::new(None, Some(old), identity(), "deleted".into());

        let parsed = ReflogEntry::try_from(entry.to_line().as_str()).unwrap();

        assert_eq!(parsed, entry);
    }

    #[test]
    fn multi_line_messages_are_flattened() {
        let entry = ReflogEntry::new(None, None, identity(), "commit: one\n\ntwo\n".into());

        assert!(entry.to_line().ends_with("\tcommit: one  two\n"));
    }
}
