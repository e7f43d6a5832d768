//! Application loop for the TUI.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use crate::app::preview::PreviewProvider;
use crate::app::prompt::DELETE_CONFIRMATION;
use crate::app::session::{Session, SessionError};
use crate::app::upload::UploadRequest;
use crate::domain::model::{FileNode, NodeId};
use crate::infra::storage::KeyValueStore;
use crate::ui::components::file_list::{FileList, FileListView};
use crate::ui::components::folder_tree::{FolderRow, FolderTree, folder_rows};
use crate::ui::components::preview::Preview;
use crate::ui::components::prompt::{Prompt, PromptKind, PromptState};

const TICK_RATE: Duration = Duration::from_millis(120);

/// Interactive terminal front end over a [`Session`].
pub struct UiApp<S, P> {
    session: Session<S, P>,
    folder_cursor: usize,
    file_cursor: usize,
    prompt: PromptState,
    pending: Option<PendingAction>,
    status: Option<StatusMessage>,
    focus: FocusTarget,
    should_quit: bool,
}

impl<S: KeyValueStore, P: PreviewProvider> UiApp<S, P> {
    pub fn new(session: Session<S, P>) -> Self {
        Self {
            session,
            folder_cursor: 0,
            file_cursor: 0,
            prompt: PromptState::default(),
            pending: None,
            status: None,
            focus: FocusTarget::Folders,
            should_quit: false,
        }
    }

    pub fn session(&self) -> &Session<S, P> {
        &self.session
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Latest status line text, if any.
    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.text.as_str())
    }

    /// Launch the terminal UI and enter the event loop.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
        terminal.hide_cursor().ok();

        let event_loop_result = self.event_loop(&mut terminal);

        disable_raw_mode().ok();
        let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        event_loop_result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        tracing::info!(nodes = self.session.tree().len(), "terminal ui started");
        loop {
            terminal.draw(|frame| self.render(frame))?;
            self.tick();

            if self.should_quit {
                break;
            }

            if event::poll(TICK_RATE)? {
                let ev = event::read()?;
                self.handle_event(ev);
            }
        }
        Ok(())
    }

    /// Draw the whole screen.
    pub fn render(&mut self, frame: &mut Frame<'_>) {
        let size = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(2)])
            .split(size);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(35),
                Constraint::Percentage(35),
            ])
            .split(layout[0]);

        let rows = self.folder_rows();
        self.folder_cursor = clamp_cursor(self.folder_cursor, rows.len());
        FolderTree.render(
            frame,
            main_chunks[0],
            &rows,
            self.folder_cursor,
            self.session.selected_folder_id(),
            self.focus == FocusTarget::Folders,
        );

        let files = self.visible_files();
        let file_cursor = clamp_cursor(self.file_cursor, files.len());
        let view = FileListView {
            title: self.file_list_title(),
            files: &files,
            cursor: file_cursor,
            selected: self.session.selected_file_id(),
            search_term: self.session.search_term(),
            search_active: self.focus == FocusTarget::Search,
            has_focus: matches!(self.focus, FocusTarget::Files | FocusTarget::Search),
        };
        FileList.render(frame, main_chunks[1], &view);

        Preview.render(
            self.session.selected_file(),
            self.session.preview_handle(),
            main_chunks[2],
            frame.buffer_mut(),
        );

        self.render_status(frame, layout[1]);
        Prompt.render(frame, size, &self.prompt);
        self.file_cursor = file_cursor;
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let line = match &self.status {
            Some(status) => {
                let style = match status.level {
                    StatusLevel::Info => Style::default().fg(Color::Gray),
                    StatusLevel::Success => Style::default().fg(Color::Green),
                    StatusLevel::Error => Style::default().fg(Color::Red),
                };
                Line::styled(status.text.clone(), style)
            }
            None => hints(),
        };
        frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: true }), inner);
    }

    fn tick(&mut self) {
        if let Some(status) = &self.status
            && status.is_expired()
        {
            self.status = None;
        }
    }

    fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event
            && key.kind != KeyEventKind::Release
        {
            self.handle_key_event(key);
        }
    }

    /// Route one key press.
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return;
        }

        if self.prompt.is_open() {
            self.handle_prompt_key(key);
            return;
        }
        if self.focus == FocusTarget::Search {
            self.handle_search_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    FocusTarget::Folders => FocusTarget::Files,
                    _ => FocusTarget::Folders,
                };
            }
            KeyCode::Char('/') => self.focus = FocusTarget::Search,
            KeyCode::Char('n') => {
                let parent = self.session.selected_folder().id.clone();
                self.pending = Some(PendingAction::CreateFolder { parent });
                let initial = self.session.new_folder_name().to_owned();
                self.prompt.open_input("Folder name", initial);
            }
            KeyCode::Char('u') => {
                let folder = self.session.selected_folder().id.clone();
                self.pending = Some(PendingAction::Upload { folder });
                self.prompt.open_input("Path to PDF", "");
            }
            KeyCode::Char('r') => {
                if let Some((id, name)) = self.focused_node() {
                    self.pending = Some(PendingAction::Rename { id });
                    self.prompt.open_input("New name", name);
                }
            }
            KeyCode::Char('d') => {
                if let Some((id, _)) = self.focused_node() {
                    self.pending = Some(PendingAction::Delete { id });
                    self.prompt.open_confirm(DELETE_CONFIRMATION);
                }
            }
            KeyCode::Char('c') => self.session.clear_preview(),
            _ => match self.focus {
                FocusTarget::Folders => self.handle_folder_key(key),
                FocusTarget::Files => self.handle_file_key(key),
                FocusTarget::Search => {}
            },
        }
    }

    fn handle_folder_key(&mut self, key: KeyEvent) {
        let rows = self.folder_rows();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.folder_cursor + 1 < rows.len() {
                    self.folder_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.folder_cursor = self.folder_cursor.saturating_sub(1);
            }
            KeyCode::Char('h') | KeyCode::Left => {
                if let Some(row) = rows.get(self.folder_cursor)
                    && row.expanded
                {
                    self.session.toggle_folder(row.id.as_str());
                }
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if let Some(row) = rows.get(self.folder_cursor)
                    && !row.expanded
                {
                    self.session.toggle_folder(row.id.as_str());
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(row) = rows.get(self.folder_cursor) {
                    self.session.select_folder(row.id.as_str());
                    self.session.toggle_folder(row.id.as_str());
                    self.file_cursor = 0;
                }
            }
            _ => {}
        }
    }

    fn handle_file_key(&mut self, key: KeyEvent) {
        let count = self.visible_files().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.file_cursor + 1 < count {
                    self.file_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.file_cursor = self.file_cursor.saturating_sub(1);
            }
            KeyCode::Enter => {
                let target = self
                    .visible_files()
                    .get(self.file_cursor)
                    .map(|file| file.id.clone());
                if let Some(id) = target {
                    match self.session.select_file(id.as_str()) {
                        Ok(()) if self.session.preview_handle().is_none() => {
                            self.set_status(StatusLevel::Info, "No stored content to preview");
                        }
                        Ok(()) => {}
                        Err(err) => self.set_status(StatusLevel::Error, err.to_string()),
                    }
                }
            }
            KeyCode::Esc => self.focus = FocusTarget::Folders,
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.session.set_search_term("");
                self.focus = FocusTarget::Folders;
            }
            KeyCode::Enter => {
                self.file_cursor = 0;
                self.focus = FocusTarget::Files;
            }
            KeyCode::Backspace => {
                let mut term = self.session.search_term().to_owned();
                term.pop();
                self.session.set_search_term(term);
                self.file_cursor = 0;
            }
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    let term = format!("{}{ch}", self.session.search_term());
                    self.session.set_search_term(term);
                    self.file_cursor = 0;
                }
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        match self.prompt.kind() {
            PromptKind::Input => match key.code {
                KeyCode::Esc => self.cancel_prompt(),
                KeyCode::Enter => {
                    let answer = self.prompt.take_input();
                    self.prompt.close();
                    if let Some(action) = self.pending.take() {
                        self.apply(action, Some(answer));
                    }
                }
                KeyCode::Backspace => self.prompt.pop_char(),
                KeyCode::Char(ch) => {
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    {
                        self.prompt.push_char(ch);
                    }
                }
                _ => {}
            },
            PromptKind::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.prompt.close();
                    if let Some(action) = self.pending.take() {
                        self.apply(action, None);
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => self.cancel_prompt(),
                _ => {}
            },
        }
    }

    fn cancel_prompt(&mut self) {
        self.prompt.close();
        self.pending = None;
    }

    fn apply(&mut self, action: PendingAction, answer: Option<String>) {
        let answer = answer.unwrap_or_default();
        match action {
            PendingAction::CreateFolder { parent } => {
                if answer.is_empty() {
                    return;
                }
                let result = self.session.create_folder(parent.as_str(), &answer);
                self.report(result, || format!("Created folder {answer}"));
            }
            PendingAction::Upload { folder } => {
                let path = PathBuf::from(answer.trim());
                if path.as_os_str().is_empty() {
                    return;
                }
                let request = match UploadRequest::from_path(&path, None) {
                    Ok(request) => request,
                    Err(err) => {
                        self.set_status(StatusLevel::Error, format!("{err:#}"));
                        return;
                    }
                };
                let name = request.name.clone();
                let result = self.session.upload(request, folder.as_str());
                self.report(result, || format!("Uploaded {name}"));
            }
            PendingAction::Rename { id } => {
                if answer.is_empty() {
                    return;
                }
                let result = self.session.rename(id.as_str(), &answer);
                self.report(result, || format!("Renamed to {answer}"));
            }
            PendingAction::Delete { id } => {
                let result = self.session.delete(id.as_str());
                self.report(result, || "Deleted".to_owned());
            }
        }
    }

    /// Surface the outcome of a session operation on the status line.
    fn report<T>(
        &mut self,
        result: Result<T, SessionError>,
        success: impl FnOnce() -> String,
    ) {
        match result {
            Ok(_) => {
                if let Some(err) = self.session.last_persist_error() {
                    let text = format!("Not saved: {err}");
                    self.set_status(StatusLevel::Error, text);
                } else {
                    self.set_status(StatusLevel::Success, success());
                }
            }
            Err(err) => self.set_status(StatusLevel::Error, err.to_string()),
        }
    }

    /// The node under the cursor of the focused panel.
    fn focused_node(&self) -> Option<(NodeId, String)> {
        match self.focus {
            FocusTarget::Folders => self
                .folder_rows()
                .into_iter()
                .nth(self.folder_cursor)
                .map(|row| (row.id, row.name)),
            FocusTarget::Files | FocusTarget::Search => self
                .visible_files()
                .get(self.file_cursor)
                .map(|file| (file.id.clone(), file.name.clone())),
        }
    }

    fn folder_rows(&self) -> Vec<FolderRow> {
        folder_rows(self.session.tree(), |id| self.session.is_expanded(id))
    }

    fn visible_files(&self) -> Vec<&FileNode> {
        if self.session.search_term().trim().is_empty() {
            self.session.selected_folder().files().collect()
        } else {
            self.session.search_results()
        }
    }

    fn file_list_title(&self) -> String {
        if self.session.search_term().trim().is_empty() {
            format!("Files · {}", self.session.selected_folder().name)
        } else {
            "Search results".to_owned()
        }
    }

    fn set_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.status = Some(StatusMessage::new(level, message.into()));
    }
}

fn hints() -> Line<'static> {
    let key = Style::default().fg(Color::Cyan);
    Line::from(vec![
        Span::styled("j/k", key),
        Span::raw(" move · "),
        Span::styled("↵", key),
        Span::raw(" open · "),
        Span::styled("tab", key),
        Span::raw(" panel · "),
        Span::styled("n", key),
        Span::raw(" folder · "),
        Span::styled("u", key),
        Span::raw(" upload · "),
        Span::styled("r", key),
        Span::raw(" rename · "),
        Span::styled("d", key),
        Span::raw(" delete · "),
        Span::styled("c", key),
        Span::raw(" close preview · "),
        Span::styled("/", key),
        Span::raw(" search · "),
        Span::styled("q", key),
        Span::raw(" quit"),
    ])
    .style(Style::default().fg(Color::Gray))
}

fn clamp_cursor(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Folders,
    Files,
    Search,
}

/// Operation waiting on the modal's answer.
#[derive(Debug, Clone)]
enum PendingAction {
    CreateFolder { parent: NodeId },
    Upload { folder: NodeId },
    Rename { id: NodeId },
    Delete { id: NodeId },
}

#[derive(Debug)]
struct StatusMessage {
    level: StatusLevel,
    text: String,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy)]
enum StatusLevel {
    Info,
    Success,
    Error,
}
