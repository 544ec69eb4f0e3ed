use crate::artifacts::digest::hasher::Hasher;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Produces the kind-specific payload of an object (no header)
pub trait Packable {
    fn serialize(&self) -> Bytes;
}

/// Parses a kind-specific payload back into a structured object
pub trait Unpackable {
    fn deserialize(payload: Bytes) -> Result<Self>
    where
        Self: Sized;
}

/// Digest of the canonical encoding of a payload of the given kind
pub fn compute_object_id(kind: ObjectType, payload: &[u8]) -> ObjectId {
    Hasher::hash_parts(&[kind.header(payload.len() as u64).as_bytes(), payload])
}

/// An immutable, content-addressed object
///
/// Copies are structural: cloning an `Object` never shares state with the
/// store that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Blob(_) => ObjectType::Blob,
            Object::Tree(_) => ObjectType::Tree,
            Object::Commit(_) => ObjectType::Commit,
            Object::Tag(_) => ObjectType::Tag,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        match self {
            Object::Blob(blob) => blob.object_id(),
            Object::Tree(tree) => tree.object_id(),
            Object::Commit(commit) => commit.object_id(),
            Object::Tag(tag) => tag.object_id(),
        }
    }

    pub fn payload(&self) -> Bytes {
        match self {
            Object::Blob(blob) => blob.serialize(),
            Object::Tree(tree) => tree.serialize(),
            Object::Commit(commit) => commit.serialize(),
            Object::Tag(tag) => tag.serialize(),
        }
    }

    /// Canonical encoding: `<kind> <payload-size>\0<payload>`
    pub fn encode(&self) -> Bytes {
        let payload = self.payload();
        let header = self.object_type().header(payload.len() as u64);

        let mut encoded = BytesMut::with_capacity(header.len() + payload.len());
        encoded.put_slice(header.as_bytes());
        encoded.put_slice(&payload);
        encoded.freeze()
    }

    /// Parse a canonical encoding
    ///
    /// Fails with `CorruptObject` when the header is malformed, the kind is
    /// unknown, the declared size disagrees with the payload, or the payload
    /// itself does not parse.
    pub fn decode(data: Bytes) -> Result<Self> {
        let header_end = data
            .iter()
            .position(|&byte| byte == 0)
            .ok_or_else(|| Error::corrupt("missing header terminator"))?;

        let header = std::str::from_utf8(&data[..header_end])
            .map_err(|_| Error::corrupt("header is not valid UTF-8"))?;
        let (kind, size) = header
            .split_once(' ')
            .ok_or_else(|| Error::corrupt(format!("malformed header {header:?}")))?;
        let kind = ObjectType::try_from(kind)?;
        let size = size
            .parse::<usize>()
            .map_err(|_| Error::corrupt(format!("malformed size in header {header:?}")))?;

        let payload = data.slice(header_end + 1..);
        if payload.len() != size {
            return Err(Error::corrupt(format!(
                "{kind} declares {size} bytes but carries {}",
                payload.len()
            )));
        }

        match kind {
            ObjectType::Blob => Ok(Object::Blob(Blob::deserialize(payload)?)),
            ObjectType::Tree => Ok(Object::Tree(Tree::deserialize(payload)?)),
            ObjectType::Commit => Ok(Object::Commit(Commit::deserialize(payload)?)),
            ObjectType::Tag => Ok(Object::Tag(Tag::deserialize(payload)?)),
        }
    }

    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Object::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn into_tree(self) -> Option<Tree> {
        match self {
            Object::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn into_commit(self) -> Option<Commit> {
        match self {
            Object::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn into_tag(self) -> Option<Tag> {
        match self {
            Object::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Object::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Object::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Object::Commit(commit)
    }
}

impl From<Tag> for Object {
    fn from(tag: Tag) -> Self {
        Object::Tag(tag)
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Blob(blob) => blob.fmt(f),
            Object::Tree(tree) => tree.fmt(f),
            Object::Commit(commit) => commit.fmt(f),
            Object::Tag(tag) => tag.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::file_mode::FileMode;
    use crate::artifacts::objects::person::Person;
    use chrono::{DateTime, FixedOffset};
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert, prop_assert_eq, proptest};
    use rstest::{fixture, rstest};

    #[fixture]
    fn person() -> Person {
        Person::try_from("Ada Lovelace <ada@example.com> 1700000000 +0130").unwrap()
    }

    #[fixture]
    fn tree() -> Tree {
        let mut tree = Tree::new();
        tree.add_entry(FileMode::Regular, Blob::new("hello").object_id(), "b.txt")
            .unwrap();
        tree.add_entry(FileMode::Executable, Blob::new("#!/bin/sh").object_id(), "a.sh")
            .unwrap();
        tree
    }

    #[test]
    fn blob_encoding_is_header_plus_content() {
        let blob = Object::from(Blob::new("hello"));

        assert_eq!(blob.encode(), Bytes::from_static(b"blob 5\0hello"));
        // git hash-object of "hello" without trailing newline
        assert_eq!(
            blob.object_id().to_string(),
            "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0"
        );
    }

    #[test]
    fn empty_tree_has_well_known_id() {
        assert_eq!(
            Tree::new().object_id().to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[rstest]
    fn every_kind_round_trips_byte_for_byte(tree: Tree, person: Person) {
        let commit = Commit::new(
            tree.object_id(),
            vec![Blob::new("p1").object_id(), Blob::new("p2").object_id()],
            person.clone(),
            person.clone(),
            "Merge things\n\nWith a body.\n".to_string(),
        );
        let tag = Tag::new(
            commit.object_id(),
            ObjectType::Commit,
            "v1.0".to_string(),
            person,
            "release\n".to_string(),
        )
        .unwrap();

        let objects = [
            Object::from(Blob::new(vec![0u8, 159, 146, 150])),
            Object::from(tree),
            Object::from(commit),
            Object::from(tag),
        ];

        for object in objects {
            let encoded = object.encode();
            let decoded = Object::decode(encoded.clone()).unwrap();

            assert_eq!(decoded.encode(), encoded);
            assert_eq!(decoded.object_id(), object.object_id());
            assert_eq!(decoded, object);
        }
    }

    #[rstest]
    #[case(b"blob 5hello".as_slice())]
    #[case(b"blob\0hello".as_slice())]
    #[case(b"blub 5\0hello".as_slice())]
    #[case(b"blob five\0hello".as_slice())]
    #[case(b"blob 4\0hello".as_slice())]
    #[case(b"blob 6\0hello".as_slice())]
    #[case(b"tree 3\0abc".as_slice())]
    #[case(b"commit 5\0hello".as_slice())]
    fn malformed_encodings_are_corrupt(#[case] data: &[u8]) {
        let result = Object::decode(Bytes::copy_from_slice(data));

        assert!(matches!(result, Err(Error::CorruptObject(_))), "{result:?}");
    }

    #[test]
    fn compute_object_id_matches_encoding_digest() {
        let blob = Object::from(Blob::new("abc"));

        assert_eq!(
            compute_object_id(ObjectType::Blob, b"abc"),
            Hasher::hash(blob.encode())
        );
    }

    proptest! {
        #[test]
        fn commits_and_tags_from_any_accepted_fields_round_trip(
            name in "(?s).{0,16}",
            email in "(?s).{0,16}",
            tag_name in "(?s).{0,16}",
            message in "(?s).{0,32}",
            seconds in 0i64..4_000_000_000,
            offset_minutes in -720i32..=840,
        ) {
            let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let timestamp = DateTime::from_timestamp(seconds, 0).unwrap().with_timezone(&offset);

            let person = match Person::new_with_timestamp(name.clone(), email.clone(), timestamp) {
                Ok(person) => person,
                Err(error) => {
                    prop_assert!(matches!(error, Error::InvalidArgument(_)));
                    prop_assert!(
                        [&name, &email].iter().any(|field| field.contains(['<', '>', '\n']))
                    );
                    return Ok(());
                }
            };

            let commit = Commit::new(
                Tree::new().object_id(),
                vec![],
                person.clone(),
                person.clone(),
                message.clone(),
            );
            let mut objects = vec![Object::from(commit.clone())];
            match Tag::new(commit.object_id(), ObjectType::Commit, tag_name.clone(), person, message) {
                Ok(tag) => objects.push(Object::from(tag)),
                Err(_) => prop_assert!(tag_name.contains('\n')),
            }

            for object in objects {
                let encoded = object.encode();
                let decoded = Object::decode(encoded.clone());

                prop_assert!(decoded.is_ok(), "{:?}", decoded);
                prop_assert_eq!(decoded.unwrap().encode(), encoded);
            }
        }
    }
}
