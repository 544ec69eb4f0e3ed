use anyhow::{Context, Result};
use cairn::areas::config::Config;
use cairn::areas::repository::Repository;
use cairn::commands::plumbing::cat_file::{CatFileMode, cat_file};
use cairn::commands::plumbing::hash_object::hash_object;
use cairn::commands::plumbing::show_ref::show_ref;
use cairn::commands::porcelain::add::add;
use cairn::commands::porcelain::branch::{BranchAction, branch};
use cairn::commands::porcelain::commit::commit;
use cairn::commands::porcelain::init::init;
use cairn::commands::porcelain::rm::rm;
use cairn::commands::porcelain::status::status;
use cairn::commands::porcelain::tag::{TagAction, tag};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CAIRN_LOG";

#[derive(Parser)]
#[command(
    name = "cairn",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A content-addressed version control store",
    long_about = "Cairn keeps snapshots of a working tree as immutable, content-addressed \
    objects (blobs, trees, commits and tags) and names them with branches and tags.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(
        name = "hash-object",
        about = "Hash a file as a blob and optionally write it to the object database",
        long_about = "This command prints the blob id of a file. With --write the blob is also \
        stored in the repository's object database."
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(
        name = "cat-file",
        about = "Print the content or the type of an object",
        long_about = "This command prints an object of the repository. \
        The object may be named by a reference, a full id or an unambiguous id prefix."
    )]
    CatFile {
        #[arg(short = 'p', long = "pretty", help = "Pretty-print the object's content")]
        pretty: bool,
        #[arg(short = 't', long = "type", conflicts_with = "pretty", help = "Print the object's type")]
        kind: bool,
        #[arg(index = 1, help = "The object to print")]
        object: String,
    },
    #[command(name = "show-ref", about = "List references and the ids they point at")]
    ShowRef,
    #[command(
        name = "add",
        about = "Add file contents to the index",
        long_about = "This command stores the current content of the given files as blobs and stages them. \
        Directories are added recursively."
    )]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "rm",
        about = "Remove files from the index and the working tree"
    )]
    Rm {
        #[arg(long, help = "Only remove the files from the index")]
        cached: bool,
        #[arg(index = 1, required = true, help = "Files or directories to remove")]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command creates a new commit in the repository with the specified commit message."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(
        name = "branch",
        about = "List, create, or delete branches",
        long_about = "Without arguments this command lists the branches. With a name it creates a branch \
        at the given start revision, or at HEAD."
    )]
    Branch {
        #[arg(short = 'd', long = "delete", requires = "name", help = "Delete the branch")]
        delete: bool,
        #[arg(index = 1, help = "The branch name")]
        name: Option<String>,
        #[arg(index = 2, conflicts_with = "delete", help = "The revision the branch starts at")]
        start: Option<String>,
    },
    #[command(
        name = "tag",
        about = "List or create tags",
        long_about = "Without arguments this command lists the tags. With a message an annotated \
        tag object is created, otherwise a lightweight tag."
    )]
    Tag {
        #[arg(short, long, requires = "name", help = "The tag message")]
        message: Option<String>,
        #[arg(index = 1, help = "The tag name")]
        name: Option<String>,
        #[arg(index = 2, requires = "name", help = "The object to tag")]
        target: Option<String>,
    },
    #[command(name = "status", about = "Show the working tree status")]
    Status {
        #[arg(short, long, help = "Give the output in the short format")]
        short: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new().with_env_overrides()?;
    let pwd = std::env::current_dir()
        .and_then(|pwd| pwd.canonicalize())
        .context("failed to read the current directory")?;
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Init { path } => {
            init(&path.unwrap_or(pwd), config, &mut stdout)?;
        }
        Commands::HashObject { write, file } => {
            let repository = match write {
                true => Some(Repository::discover(&pwd, config)?),
                false => None,
            };
            hash_object(
                &file,
                repository.as_ref().map(Repository::database),
                &mut stdout,
            )?;
        }
        Commands::CatFile {
            pretty: _,
            kind,
            object,
        } => {
            let repository = Repository::discover(&pwd, config)?;
            let mode = if kind {
                CatFileMode::Type
            } else {
                CatFileMode::Pretty
            };
            cat_file(&repository, &object, mode, &mut stdout)?;
        }
        Commands::ShowRef => {
            let repository = Repository::discover(&pwd, config)?;
            show_ref(&repository, &mut stdout)?;
        }
        Commands::Add { paths } => {
            let mut repository = Repository::discover(&pwd, config)?;
            add(&mut repository, &absolutize(&pwd, paths))?;
        }
        Commands::Rm { cached, paths } => {
            let mut repository = Repository::discover(&pwd, config)?;
            rm(&mut repository, &absolutize(&pwd, paths), cached, &mut stdout)?;
        }
        Commands::Commit { message } => {
            let mut repository = Repository::discover(&pwd, config)?;
            commit(&mut repository, &message, &mut stdout)?;
        }
        Commands::Branch {
            delete,
            name,
            start,
        } => {
            let repository = Repository::discover(&pwd, config)?;
            let action = match (name, delete) {
                (None, _) => BranchAction::List,
                (Some(name), true) => BranchAction::Delete { name },
                (Some(name), false) => BranchAction::Create { name, start },
            };
            branch(&repository, action, &mut stdout)?;
        }
        Commands::Tag {
            message,
            name,
            target,
        } => {
            let repository = Repository::discover(&pwd, config)?;
            let action = match name {
                None => TagAction::List,
                Some(name) => TagAction::Create {
                    name,
                    target,
                    message,
                },
            };
            tag(&repository, action, &mut stdout)?;
        }
        Commands::Status { short } => {
            let repository = Repository::discover(&pwd, config)?;
            status(&repository, short, &mut stdout)?;
        }
    }

    Ok(())
}

/// Paths on the command line are relative to where the binary runs, not to
/// the repository root
fn absolutize(pwd: &std::path::Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.into_iter().map(|path| pwd.join(path)).collect()
}
