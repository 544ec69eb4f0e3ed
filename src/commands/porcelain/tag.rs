use crate::areas::repository::Repository;
use crate::artifacts::objects::person::Person;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagAction {
    List,
    Create {
        name: String,
        target: Option<String>,
        /// Annotated tags carry a message; lightweight ones do not
        message: Option<String>,
    },
}

pub fn tag(repository: &Repository, action: TagAction, writer: &mut impl Write) -> anyhow::Result<()> {
    match action {
        TagAction::List => {
            for tag in repository.refs().list_tags()? {
                writeln!(writer, "{}", tag.short_name())?;
            }
        }
        TagAction::Create {
            name,
            target,
            message: Some(message),
        } => {
            let tagger = Person::from_config(repository.config())?;
            repository.create_tag(&name, target.as_deref(), tagger, &message)?;
        }
        TagAction::Create {
            name,
            target,
            message: None,
        } => {
            repository.create_lightweight_tag(&name, target.as_deref())?;
        }
    }

    Ok(())
}
