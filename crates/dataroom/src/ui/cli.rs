//! Scriptable command line over the same session operations as the TUI.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};

use crate::app::preview::{MemoryPreviews, PreviewProvider};
use crate::app::prompt::{AssumeYes, Prompter};
use crate::app::session::Session;
use crate::app::upload::UploadRequest;
use crate::domain::model::{FolderNode, Node, Tree};
use crate::infra::config::Config;
use crate::infra::storage::KeyValueStore;
use crate::ui::components::file_list::human_size;

/// Organize PDF documents in a folder tree.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding the stored tree (overrides configuration).
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the whole tree as an outline.
    Tree,
    /// List the direct contents of a folder (the root by default).
    Ls { folder: Option<String> },
    /// Create a folder; asks for a name when none is given.
    Mkdir {
        /// Folder to create it in (the root by default).
        #[arg(long)]
        parent: Option<String>,
        name: Option<String>,
    },
    /// Upload a PDF file.
    Upload {
        path: PathBuf,
        /// Target folder (the root by default).
        #[arg(long)]
        folder: Option<String>,
        /// Declared media type; guessed from the extension otherwise.
        #[arg(long)]
        mime: Option<String>,
    },
    /// Rename a file or folder; asks for a name when none is given.
    Rename { id: String, name: Option<String> },
    /// Delete a file or folder with everything inside it.
    Rm {
        id: String,
        /// Skip the confirmation question.
        #[arg(long, short)]
        yes: bool,
    },
    /// Find files whose name contains a term, ignoring case.
    Search { term: String },
    /// Show a file and optionally write its content out.
    Preview {
        id: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Start the terminal interface.
    Ui,
}

/// Run one command against the configured storage.
pub fn run(command: Command, config: &Config) -> Result<()> {
    let mut session = crate::ui::open_session(config, MemoryPreviews::new());
    let mut prompter = LinePrompter::stdio();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(command, &mut session, &mut prompter, &mut out)
}

/// Apply `command` to `session`, writing human-readable output to `out`.
pub fn execute<S, P>(
    command: Command,
    session: &mut Session<S, P>,
    prompter: &mut dyn Prompter,
    out: &mut dyn Write,
) -> Result<()>
where
    S: KeyValueStore,
    P: PreviewProvider,
{
    match command {
        Command::Tree => {
            out.write_all(render_outline(session.tree()).as_bytes())?;
        }
        Command::Ls { folder } => {
            let tree = session.tree();
            let id = folder.unwrap_or_else(|| tree.root_id().to_string());
            let folder = tree
                .folder(&id)
                .ok_or_else(|| anyhow!("no folder with id `{id}`"))?;
            out.write_all(render_listing(folder).as_bytes())?;
        }
        Command::Mkdir { parent, name } => {
            let parent = parent.unwrap_or_else(|| session.tree().root_id().to_string());
            let created = match name {
                Some(name) => Some(session.create_folder(&parent, &name)?),
                None => session.request_create_folder(&parent, prompter)?,
            };
            match created {
                Some(id) => writeln!(out, "{id}")?,
                None => writeln!(out, "cancelled")?,
            }
        }
        Command::Upload { path, folder, mime } => {
            let request = UploadRequest::from_path(&path, mime.as_deref())?;
            let folder = folder.unwrap_or_else(|| session.tree().root_id().to_string());
            let id = session.upload(request, &folder)?;
            writeln!(out, "{id}")?;
        }
        Command::Rename { id, name } => {
            let renamed = match name {
                Some(name) => {
                    session.rename(&id, &name)?;
                    true
                }
                None => session.request_rename(&id, prompter)?,
            };
            if !renamed {
                writeln!(out, "cancelled")?;
            }
        }
        Command::Rm { id, yes } => {
            let deleted = if yes {
                session.request_delete(&id, &mut AssumeYes)?
            } else {
                session.request_delete(&id, prompter)?
            };
            if !deleted {
                writeln!(out, "cancelled")?;
            }
        }
        Command::Search { term } => {
            session.set_search_term(term);
            for file in session.search_results() {
                writeln!(out, "{}\t{}\t{}", file.id, file.name, human_size(file.size))?;
            }
        }
        Command::Preview { id, output } => {
            session.select_file(&id)?;
            let file = session
                .selected_file()
                .ok_or_else(|| anyhow!("no file with id `{id}`"))?;
            writeln!(
                out,
                "{}\t{}\t{}",
                file.name,
                file.mime,
                human_size(file.size)
            )?;
            if let Some(path) = output {
                let content = file
                    .content
                    .as_ref()
                    .ok_or_else(|| anyhow!("file `{id}` has no stored content"))?
                    .decode()?;
                fs::write(&path, &content.bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                writeln!(out, "wrote {}", path.display())?;
            }
        }
        Command::Ui => bail!("the terminal interface is started by the binary, not a script"),
    }

    if let Some(err) = session.last_persist_error() {
        bail!("changes were not saved: {err}");
    }
    Ok(())
}

/// Indented outline of the whole tree: folders end in `/`, every line
/// carries the node id.
pub fn render_outline(tree: &Tree) -> String {
    let mut output = String::new();
    outline_folder(tree.root(), 0, &mut output);
    output
}

fn outline_folder(folder: &FolderNode, depth: usize, output: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(output, "{indent}{}/  [{}]", folder.name, folder.id);
    for child in &folder.children {
        match child {
            Node::Folder(sub) => outline_folder(sub, depth + 1, output),
            Node::File(file) => {
                let _ = writeln!(
                    output,
                    "{indent}  {}  [{}]  {}",
                    file.name,
                    file.id,
                    human_size(file.size)
                );
            }
        }
    }
}

/// One line per direct child of `folder`.
pub fn render_listing(folder: &FolderNode) -> String {
    let mut output = String::new();
    for child in &folder.children {
        let _ = match child {
            Node::Folder(sub) => writeln!(output, "folder\t{}\t{}", sub.id, sub.name),
            Node::File(file) => writeln!(
                output,
                "file\t{}\t{}\t{}",
                file.id,
                file.name,
                human_size(file.size)
            ),
        };
    }
    output
}

/// Prompts on a writer and reads answers line by line.
///
/// An empty answer accepts the offered default; end of input cancels.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl LinePrompter<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read answer");
                None
            }
        }
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn input(&mut self, label: &str, initial: &str) -> Option<String> {
        let _ = write!(self.output, "{label} [{initial}]: ");
        let _ = self.output.flush();
        let answer = self.read_line()?;
        if answer.is_empty() {
            Some(initial.to_owned())
        } else {
            Some(answer)
        }
    }

    fn confirm(&mut self, message: &str) -> bool {
        let _ = write!(self.output, "{message} [y/N]: ");
        let _ = self.output.flush();
        self.read_line()
            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
    }
}
