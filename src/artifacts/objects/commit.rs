//! Commit object
//!
//! Commits record a snapshot of the repository at a point in time:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s): none for a root commit, several for a merge
//! - Author and committer identities
//! - Commit message
//!
//! ## Format
//!
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::{Packable, Unpackable, compute_object_id};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::person::Person;
use crate::errors::{Error, Result};
use bytes::Bytes;

/// Commit object
///
/// Fields are private: the identity is computed once in [`Commit::new`] and
/// stays valid because nothing can change the commit afterwards.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    tree_oid: ObjectId,
    parents: Vec<ObjectId>,
    author: Person,
    committer: Person,
    message: String,
    oid: ObjectId,
}

impl Commit {
    pub fn new(
        tree_oid: ObjectId,
        parents: Vec<ObjectId>,
        author: Person,
        committer: Person,
        message: String,
    ) -> Self {
        let mut commit = Commit {
            tree_oid,
            parents,
            author,
            committer,
            message,
            oid: ObjectId::default(),
        };
        commit.oid = compute_object_id(ObjectType::Commit, &commit.serialize());
        commit
    }

    pub fn object_id(&self) -> ObjectId {
        self.oid
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn author(&self) -> &Person {
        &self.author
    }

    pub fn committer(&self) -> &Person {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// First line of the message, for one-line summaries
    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl Packable for Commit {
    fn serialize(&self) -> Bytes {
        let mut content = format!("tree {}\n", self.tree_oid);
        for parent in &self.parents {
            content.push_str(&format!("parent {parent}\n"));
        }
        content.push_str(&format!("author {}\n", self.author));
        content.push_str(&format!("committer {}\n", self.committer));
        content.push('\n');
        content.push_str(&self.message);

        Bytes::from(content)
    }
}

impl Unpackable for Commit {
    fn deserialize(payload: Bytes) -> Result<Self> {
        let content = std::str::from_utf8(&payload)
            .map_err(|_| Error::corrupt("commit is not valid UTF-8"))?;
        let (headers, message) = content
            .split_once("\n\n")
            .ok_or_else(|| Error::corrupt("commit is missing the message separator"))?;
        let mut lines = headers.split('\n').peekable();

        let tree_oid = lines
            .next()
            .and_then(|line| line.strip_prefix("tree "))
            .ok_or_else(|| Error::corrupt("commit is missing its tree line"))?;
        let tree_oid = parse_oid(tree_oid)?;

        // zero, one, or many parents
        let mut parents = Vec::new();
        while let Some(parent) = lines.peek().and_then(|line| line.strip_prefix("parent ")) {
            parents.push(parse_oid(parent)?);
            lines.next();
        }

        let author = lines
            .next()
            .and_then(|line| line.strip_prefix("author "))
            .ok_or_else(|| Error::corrupt("commit is missing its author line"))?;
        let committer = lines
            .next()
            .and_then(|line| line.strip_prefix("committer "))
            .ok_or_else(|| Error::corrupt("commit is missing its committer line"))?;

        if let Some(extra) = lines.next() {
            return Err(Error::corrupt(format!("unexpected commit header {extra:?}")));
        }

        Ok(Self::new(
            tree_oid,
            parents,
            Person::try_from(author)?,
            Person::try_from(committer)?,
            message.to_string(),
        ))
    }
}

pub(crate) fn parse_oid(hex: &str) -> Result<ObjectId> {
    ObjectId::try_parse(hex).map_err(|_| Error::corrupt(format!("invalid object id {hex:?}")))
}

impl std::fmt::Display for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.serialize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn person() -> Person {
        Person::try_from("Ada Lovelace <ada@example.com> 1700000000 +0000").unwrap()
    }

    #[fixture]
    fn tree_oid() -> ObjectId {
        ObjectId::try_parse("4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap()
    }

    #[rstest]
    fn root_commit_payload_layout(person: Person, tree_oid: ObjectId) {
        let commit = Commit::new(tree_oid, vec![], person.clone(), person, "init".into());

        assert_eq!(
            commit.serialize(),
            Bytes::from(
                "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                 author Ada Lovelace <ada@example.com> 1700000000 +0000\n\
                 committer Ada Lovelace <ada@example.com> 1700000000 +0000\n\
                 \n\
                 init"
            )
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    fn parents_survive_decoding(person: Person, tree_oid: ObjectId, #[case] count: usize) {
        let parents = (0..count)
            .map(|i| compute_object_id(ObjectType::Blob, format!("parent {i}").as_bytes()))
            .collect::<Vec<_>>();
        let commit = Commit::new(tree_oid, parents.clone(), person.clone(), person, "m".into());

        let decoded = Commit::deserialize(commit.serialize()).unwrap();

        assert_eq!(decoded.parents(), parents.as_slice());
        assert_eq!(decoded.is_merge(), count > 1);
        assert_eq!(decoded.object_id(), commit.object_id());
    }

    #[rstest]
    fn message_whitespace_is_preserved(person: Person, tree_oid: ObjectId) {
        let message = "subject\n\n\nbody with blank lines\n\n".to_string();
        let commit = Commit::new(tree_oid, vec![], person.clone(), person, message.clone());

        let decoded = Commit::deserialize(commit.serialize()).unwrap();

        assert_eq!(decoded.message(), message);
        assert_eq!(decoded.short_message(), "subject");
    }

    #[test]
    fn unknown_header_is_corrupt() {
        let payload = Bytes::from(
            "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
             author A <a@a> 1 +0000\n\
             committer A <a@a> 1 +0000\n\
             gpgsig nope\n\
             \n\
             m",
        );

        assert!(matches!(
            Commit::deserialize(payload),
            Err(Error::CorruptObject(_))
        ));
    }
}
