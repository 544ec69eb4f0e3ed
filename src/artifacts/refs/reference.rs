use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::ref_name::RefName;
use crate::artifacts::refs::{SYMREF_PATTERN, SYMREF_PREFIX};
use crate::errors::{Error, Result};

/// The stored value of a reference
///
/// A reference file holds either a 40-hex digest (`Direct`) or
/// `ref: <other-ref>` (`Symbolic`), followed by a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Direct(ObjectId),
    Symbolic(RefName),
}

impl Reference {
    /// Parse the content of the reference file for `name`
    pub fn parse(name: &RefName, content: &str) -> Result<Self> {
        let malformed = || Error::MalformedReference {
            name: name.to_string(),
            content: content.to_string(),
        };

        let value = content.trim_end();
        if value.is_empty() {
            return Err(malformed());
        }

        let re = SYMREF_PATTERN
            .as_ref()
            .map_err(|error| Error::InvalidState(format!("invalid symref regex: {error}")))?;

        match re.captures(value) {
            Some(symref) => RefName::try_parse(&symref[1])
                .map(Reference::Symbolic)
                .map_err(|_| malformed()),
            None => ObjectId::try_parse(value)
                .map(Reference::Direct)
                .map_err(|_| malformed()),
        }
    }

    /// Content written to the reference file
    pub fn to_file_content(&self) -> String {
        match self {
            Reference::Direct(oid) => format!("{oid}\n"),
            Reference::Symbolic(target) => format!("{SYMREF_PREFIX}{target}\n"),
        }
    }

    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Reference::Direct(oid) => Some(*oid),
            Reference::Symbolic(_) => None,
        }
    }

    pub fn as_symbolic(&self) -> Option<&RefName> {
        match self {
            Reference::Direct(_) => None,
            Reference::Symbolic(target) => Some(target),
        }
    }
}

impl From<ObjectId> for Reference {
    fn from(oid: ObjectId) -> Self {
        Reference::Direct(oid)
    }
}

impl From<RefName> for Reference {
    fn from(target: RefName) -> Self {
        Reference::Symbolic(target)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Direct(oid) => write!(f, "{oid}"),
            Reference::Symbolic(target) => write!(f, "{SYMREF_PREFIX}{target}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const OID: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    #[test]
    fn parses_direct_values() {
        let name = RefName::head();
        let reference = Reference::parse(&name, &format!("{OID}\n")).unwrap();

        assert_eq!(reference, Reference::Direct(OID.parse().unwrap()));
        assert_eq!(reference.to_file_content(), format!("{OID}\n"));
    }

    #[test]
    fn parses_symbolic_values() {
        let name = RefName::head();
        let reference = Reference::parse(&name, "ref: refs/heads/master\n").unwrap();

        assert_eq!(
            reference.as_symbolic().map(RefName::as_str),
            Some("refs/heads/master")
        );
        assert_eq!(reference.to_file_content(), "ref: refs/heads/master\n");
    }

    #[rstest]
    #[case("")]
    #[case("\n")]
    #[case("not a digest")]
    #[case("ref: ")]
    #[case("ref: refs/heads/bad..name")]
    #[case("ce013625")]
    fn rejects_malformed_values(#[case] content: &str) {
        let name = RefName::branch("main").unwrap();

        assert!(matches!(
            Reference::parse(&name, content),
            Err(Error::MalformedReference { .. })
        ));
    }
}
