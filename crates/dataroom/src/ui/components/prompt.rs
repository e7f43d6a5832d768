//! Modal prompt for names, paths and confirmations.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// What the modal is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptKind {
    #[default]
    Input,
    Confirm,
}

/// Interactive state backing the modal overlay.
#[derive(Debug, Default, Clone)]
pub struct PromptState {
    visible: bool,
    kind: PromptKind,
    title: String,
    input: String,
}

impl PromptState {
    /// Ask for a line of text, prefilled with `initial`.
    pub fn open_input(&mut self, title: impl Into<String>, initial: impl Into<String>) {
        self.visible = true;
        self.kind = PromptKind::Input;
        self.title = title.into();
        self.input = initial.into();
    }

    /// Ask a yes/no question.
    pub fn open_confirm(&mut self, message: impl Into<String>) {
        self.visible = true;
        self.kind = PromptKind::Confirm;
        self.title = message.into();
        self.input.clear();
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.input.clear();
    }

    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Consume the current input, leaving the buffer empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }
}

/// Visual component that renders the modal.
#[derive(Debug, Default)]
pub struct Prompt;

impl Prompt {
    /// Draw the modal if it is visible.
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &PromptState) {
        if !state.is_open() {
            return;
        }

        let width = area.width.saturating_sub(10).min(80);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(6) / 2,
            width,
            height: 5.min(area.height),
        };

        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(state.title().to_owned())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        frame.render_widget(block.clone(), popup);

        let inner = block.inner(popup);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);

        let (body, hint) = match state.kind() {
            PromptKind::Input => (
                Line::from(vec![
                    Span::styled("> ", Style::default().fg(Color::Cyan)),
                    Span::raw(state.input().to_owned()),
                ]),
                "enter accept · esc cancel",
            ),
            PromptKind::Confirm => (
                Line::styled(
                    "Press y to confirm",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                "y yes · n/esc no",
            ),
        };
        frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), layout[0]);
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
            layout[1],
        );
    }
}
