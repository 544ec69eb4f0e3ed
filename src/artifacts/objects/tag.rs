//! Annotated tag object
//!
//! ## Format
//!
//! ```text
//! tag <size>\0
//! object <target-sha>
//! type <target-kind>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <tag message>
//! ```

use crate::artifacts::objects::commit::parse_oid;
use crate::artifacts::objects::object::{Packable, Unpackable, compute_object_id};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::person::Person;
use crate::errors::{Error, Result};
use bytes::Bytes;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tag {
    target: ObjectId,
    target_type: ObjectType,
    name: String,
    tagger: Person,
    message: String,
    oid: ObjectId,
}

impl Tag {
    pub fn new(
        target: ObjectId,
        target_type: ObjectType,
        name: String,
        tagger: Person,
        message: String,
    ) -> Result<Self> {
        if name.contains('\n') {
            return Err(Error::invalid(format!(
                "tag name {name:?} may not contain a newline"
            )));
        }

        let mut tag = Tag {
            target,
            target_type,
            name,
            tagger,
            message,
            oid: ObjectId::default(),
        };
        tag.oid = compute_object_id(ObjectType::Tag, &tag.serialize());
        Ok(tag)
    }

    pub fn object_id(&self) -> ObjectId {
        self.oid
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> &Person {
        &self.tagger
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Packable for Tag {
    fn serialize(&self) -> Bytes {
        Bytes::from(format!(
            "object {}\ntype {}\ntag {}\ntagger {}\n\n{}",
            self.target, self.target_type, self.name, self.tagger, self.message
        ))
    }
}

impl Unpackable for Tag {
    fn deserialize(payload: Bytes) -> Result<Self> {
        let content =
            std::str::from_utf8(&payload).map_err(|_| Error::corrupt("tag is not valid UTF-8"))?;
        let (headers, message) = content
            .split_once("\n\n")
            .ok_or_else(|| Error::corrupt("tag is missing the message separator"))?;

        let headers = headers.split('\n').collect::<Vec<_>>();
        let [object, kind, name, tagger] = headers.as_slice() else {
            return Err(Error::corrupt(format!(
                "tag has {} header lines, expected 4",
                headers.len()
            )));
        };

        let header = |line: &str, prefix: &str| {
            line.strip_prefix(prefix)
                .map(str::to_string)
                .ok_or_else(|| Error::corrupt(format!("tag header {prefix:?} is missing")))
        };

        let target = parse_oid(&header(*object, "object ")?)?;
        let target_type = ObjectType::try_from(header(*kind, "type ")?.as_str())?;
        let name = header(*name, "tag ")?;
        let tagger = Person::try_from(header(*tagger, "tagger ")?.as_str())?;

        Self::new(target, target_type, name, tagger, message.to_string())
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.serialize()))
    }
}
