//! Preview panel describing the selected file and its preview handle.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::preview::PreviewHandle;
use crate::domain::model::FileNode;
use crate::ui::components::file_list::human_size;
use crate::ui::components::folder_tree::border_style;

/// Ratatui component responsible for the preview panel.
#[derive(Debug, Default)]
pub struct Preview;

impl Preview {
    pub fn render(
        &self,
        file: Option<&FileNode>,
        handle: Option<&PreviewHandle>,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let title = file
            .map(|file| format!("Preview · {}", file.name))
            .unwrap_or_else(|| "Preview".to_string());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style(file.is_some()));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(file) = file else {
            Paragraph::new("Select a file to preview")
                .style(
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )
                .wrap(Wrap { trim: true })
                .render(inner, buf);
            return;
        };

        let label = Style::default().fg(Color::DarkGray);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("name  ", label),
                Span::raw(file.name.clone()),
            ]),
            Line::from(vec![
                Span::styled("type  ", label),
                Span::raw(file.mime.clone()),
            ]),
            Line::from(vec![
                Span::styled("size  ", label),
                Span::raw(human_size(file.size)),
            ]),
            Line::from(vec![
                Span::styled("id    ", label),
                Span::raw(file.id.to_string()),
            ]),
            Line::default(),
        ];

        match handle {
            Some(handle) => {
                lines.push(Line::styled("Open with your viewer:", label));
                lines.push(Line::styled(
                    handle.url().to_owned(),
                    Style::default().fg(Color::Cyan),
                ));
            }
            None => lines.push(Line::styled(
                "No preview available",
                Style::default().fg(Color::Yellow),
            )),
        }
        lines.push(Line::default());
        lines.push(Line::styled("press c to close", label));

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
