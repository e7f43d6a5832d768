//! File list panel: files of the selected folder, or search results.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::domain::model::{FileNode, NodeId};
use crate::ui::components::folder_tree::{border_style, highlight_style};

/// Everything the panel needs for one frame.
#[derive(Debug)]
pub struct FileListView<'a> {
    pub title: String,
    pub files: &'a [&'a FileNode],
    pub cursor: usize,
    pub selected: Option<&'a NodeId>,
    pub search_term: &'a str,
    pub search_active: bool,
    pub has_focus: bool,
}

/// Ratatui component responsible for rendering the file list.
#[derive(Debug, Default)]
pub struct FileList;

impl FileList {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, view: &FileListView<'_>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(view.title.clone())
            .border_style(border_style(view.has_focus));
        frame.render_widget(block.clone(), area);

        let inner = block.inner(area);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        let search_text = if view.search_term.is_empty() && !view.search_active {
            "⌕ search (press /)".to_string()
        } else {
            format!("⌕ {}", view.search_term)
        };
        let mut search_style = Style::default().fg(Color::Gray);
        if view.search_active {
            search_style = search_style.add_modifier(Modifier::BOLD).fg(Color::Cyan);
        }
        frame.render_widget(Paragraph::new(search_text).style(search_style), layout[0]);

        if view.files.is_empty() {
            let message = if view.search_term.trim().is_empty() {
                "No files in this folder"
            } else {
                "No files match"
            };
            let placeholder = Paragraph::new(message).style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            );
            frame.render_widget(placeholder, layout[1]);
            return;
        }

        let items: Vec<ListItem<'_>> = view
            .files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let mut name_style = Style::default();
                if view.selected == Some(&file.id) {
                    name_style = name_style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                }
                let mut item = ListItem::new(Line::from(vec![
                    Span::styled("• ", Style::default().fg(Color::Gray)),
                    Span::styled(file.name.clone(), name_style),
                    Span::styled(
                        format!("  {}", human_size(file.size)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]));
                if index % 2 == 1 {
                    item = item.style(Style::default().bg(Color::Rgb(24, 24, 24)));
                }
                item
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(Some(view.cursor.min(view.files.len() - 1)));

        let list = List::new(items)
            .highlight_style(highlight_style(view.has_focus))
            .highlight_symbol("▸ ");
        frame.render_stateful_widget(list, layout[1], &mut list_state);
    }
}

/// Byte count for display, e.g. `512 B`, `1.5 KiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in UNITS.iter().skip(1) {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = *next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
