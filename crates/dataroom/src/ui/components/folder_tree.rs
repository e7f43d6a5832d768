//! Folder tree panel.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::domain::model::{FolderNode, NodeId, Tree};

/// One visible line of the folder panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRow {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    pub expanded: bool,
    pub has_children: bool,
}

/// Flatten the folders of `tree` in display order, descending only into
/// expanded folders.
pub fn folder_rows(tree: &Tree, is_expanded: impl Fn(&str) -> bool) -> Vec<FolderRow> {
    let mut rows = Vec::new();
    push_rows(tree.root(), 0, &is_expanded, &mut rows);
    rows
}

fn push_rows(
    folder: &FolderNode,
    depth: usize,
    is_expanded: &impl Fn(&str) -> bool,
    rows: &mut Vec<FolderRow>,
) {
    let expanded = is_expanded(folder.id.as_str());
    rows.push(FolderRow {
        id: folder.id.clone(),
        name: folder.name.clone(),
        depth,
        expanded,
        has_children: folder.folders().next().is_some(),
    });
    if expanded {
        for child in folder.folders() {
            push_rows(child, depth + 1, is_expanded, rows);
        }
    }
}

/// Ratatui component responsible for rendering the folder panel.
#[derive(Debug, Default)]
pub struct FolderTree;

impl FolderTree {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        rows: &[FolderRow],
        cursor: usize,
        selected: &NodeId,
        has_focus: bool,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Folders")
            .border_style(border_style(has_focus));

        let items: Vec<ListItem<'_>> = rows
            .iter()
            .map(|row| {
                let symbol = if row.expanded {
                    "▾"
                } else if row.has_children {
                    "▸"
                } else {
                    "·"
                };
                let mut name_style = Style::default();
                if &row.id == selected {
                    name_style = name_style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                }
                ListItem::new(Line::from(vec![
                    Span::raw("  ".repeat(row.depth)),
                    Span::styled(format!("{symbol} "), Style::default().fg(Color::Yellow)),
                    Span::styled(row.name.clone(), name_style),
                ]))
            })
            .collect();

        let mut list_state = ListState::default();
        if !rows.is_empty() {
            list_state.select(Some(cursor.min(rows.len() - 1)));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style(has_focus))
            .highlight_symbol("▸ ");
        frame.render_stateful_widget(list, area, &mut list_state);
    }
}

pub(crate) fn border_style(has_focus: bool) -> Style {
    Style::default().fg(if has_focus {
        Color::Cyan
    } else {
        Color::DarkGray
    })
}

pub(crate) fn highlight_style(has_focus: bool) -> Style {
    let background = if has_focus { Color::Cyan } else { Color::Gray };
    Style::default()
        .fg(Color::Black)
        .bg(background)
        .add_modifier(Modifier::BOLD)
}
