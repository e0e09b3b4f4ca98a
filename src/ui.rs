use crate::app::{App, Mode, Status};
use crate::gratitude_entry::GratitudeEntry;
use color_eyre::Result;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::io::{stdout, Stdout};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const TITLE: &str = "What are you thankful for today?";
const PLACEHOLDER: &str = "Write your gratitude entry...";

/// Owns the terminal for the lifetime of the session.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(Tui { terminal })
    }

    pub fn draw(&mut self, app: &App) -> Result<()> {
        self.terminal.draw(|f| draw(f, app))?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new(TITLE)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(title, chunks[0]);

    draw_draft(f, app, chunks[1]);
    draw_attachment(f, app, chunks[2]);

    if let Some(status) = app.status() {
        let (text, color) = match status {
            Status::Info(msg) => (msg.as_str(), Color::Green),
            Status::Error(msg) => (msg.as_str(), Color::Red),
        };
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(color)),
            chunks[3],
        );
    }

    draw_entries(f, app, chunks[4]);

    let controls_paragraph = Paragraph::new(controls(app.mode()))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(controls_paragraph, chunks[5]);
}

fn draw_draft(f: &mut Frame, app: &App, area: Rect) {
    let draft = &app.store().draft().text;
    let focused = app.mode() == Mode::Compose;
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Entry")
        .border_style(border_style(focused));
    let inner = block.inner(area);

    let (line, col) = app.cursor_line_col();
    let (rows, (cursor_row, cursor_col)) = wrap_draft(draft, line, col, inner.width as usize);
    let scroll = cursor_row.saturating_sub(inner.height.saturating_sub(1) as usize);

    let input = if draft.is_empty() {
        Paragraph::new(PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        let lines: Vec<Line> = rows.into_iter().map(Line::from).collect();
        Paragraph::new(lines).scroll((scroll as u16, 0))
    };
    f.render_widget(input.block(block), area);

    if focused {
        let x = inner.x + (cursor_col as u16).min(inner.width.saturating_sub(1));
        let y = inner.y + (cursor_row - scroll) as u16;
        f.set_cursor_position((x, y));
    }
}

/// Hard-wraps the draft to `width` columns. Returns the display rows and
/// the cursor's row and column within them.
fn wrap_draft(text: &str, line: usize, col: usize, width: usize) -> (Vec<String>, (usize, usize)) {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut cursor = (0, 0);

    for (n, logical) in text.split('\n').enumerate() {
        let mut row = String::new();
        let mut row_width = 0;
        for (i, c) in logical.chars().enumerate() {
            let w = c.width().unwrap_or(0);
            if row_width + w > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            if n == line && i == col {
                cursor = (rows.len(), row_width);
            }
            row.push(c);
            row_width += w;
        }
        if n == line && col >= logical.chars().count() {
            // A full row pushes the cursor onto the next one.
            cursor = if row_width >= width {
                (rows.len() + 1, 0)
            } else {
                (rows.len(), row_width)
            };
        }
        rows.push(row);
    }

    (rows, cursor)
}

fn draw_attachment(f: &mut Frame, app: &App, area: Rect) {
    let prompting = app.mode() == Mode::AttachPrompt;
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Image")
        .border_style(border_style(prompting));
    let inner = block.inner(area);

    let content = if prompting {
        Line::from(vec![
            Span::styled("Path: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(app.attach_path()),
        ])
    } else if app.is_loading_image() {
        Line::from(Span::styled(
            "Loading image...",
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some(image) = &app.store().draft().image {
        Line::from(vec![
            Span::raw(format!("Attached: {}", image.summary())),
            Span::styled("  (Ctrl+R to remove)", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(Span::styled(
            "Press Ctrl+O to add an image",
            Style::default().fg(Color::DarkGray),
        ))
    };
    f.render_widget(Paragraph::new(content).block(block), area);

    if prompting {
        let x = inner.x + ("Path: ".width() + app.attach_path().width()) as u16;
        f.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y));
    }
}

fn draw_entries(f: &mut Frame, app: &App, area: Rect) {
    let store = app.store();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Entries ({})", store.len()));

    if store.is_empty() {
        let empty = Paragraph::new("No entries yet")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = store
        .entries()
        .iter()
        .skip(app.scroll())
        .map(|entry| entry_item(entry, app.date_format()))
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn entry_item<'a>(entry: &'a GratitudeEntry, date_format: &str) -> ListItem<'a> {
    let mut lines: Vec<Line> = entry.text.lines().map(Line::raw).collect();
    if let Some(image) = &entry.image {
        lines.push(Line::from(Span::styled(
            format!("[image: {}]", image.summary()),
            Style::default().fg(Color::Magenta),
        )));
    }
    lines.push(Line::from(Span::styled(
        entry.created_at.format(date_format).to_string(),
        Style::default().fg(Color::Gray),
    )));
    lines.push(Line::default());
    ListItem::new(lines)
}

fn controls(mode: Mode) -> Line<'static> {
    let key = |k: &'static str| Span::styled(k, Style::default().add_modifier(Modifier::BOLD));
    match mode {
        Mode::Compose => Line::from(vec![
            key("Ctrl+S"),
            Span::raw(" save, "),
            key("Ctrl+O"),
            Span::raw(" add image, "),
            key("PgUp/PgDn"),
            Span::raw(" scroll, "),
            key("Esc"),
            Span::raw(" quit"),
        ]),
        Mode::AttachPrompt => Line::from(vec![
            key("Enter"),
            Span::raw(" load image, "),
            key("Esc"),
            Span::raw(" cancel"),
        ]),
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageConfig;
    use crate::entry_store::EntryStore;
    use crate::gratitude_entry::EncodedImage;
    use crate::image_loader::ImageLoader;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 40)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app_with(store: EntryStore) -> App {
        let (loader, _rx) = ImageLoader::new(&ImageConfig::default());
        App::new(store, loader, "%Y-%m-%d".into())
    }

    #[test]
    fn empty_screen_shows_title_and_placeholder() {
        let screen = render(&app_with(EntryStore::new()));
        assert!(screen.contains(TITLE));
        assert!(screen.contains(PLACEHOLDER));
        assert!(screen.contains("Press Ctrl+O to add an image"));
        assert!(screen.contains("No entries yet"));
    }

    #[test]
    fn entries_render_newest_first_with_image_and_date() {
        let mut store = EntryStore::new();
        store.set_draft_text("Morning coffee");
        store.submit().unwrap();
        store.set_draft_text("Evening walk");
        store.set_draft_image(Some(EncodedImage::new("image/png", "AAAA", 2048)));
        store.submit().unwrap();
        let today = store.entries()[0].created_at.format("%Y-%m-%d").to_string();

        let screen = render(&app_with(store));
        let evening = screen.find("Evening walk").unwrap();
        let morning = screen.find("Morning coffee").unwrap();
        assert!(evening < morning);
        assert!(screen.contains("[image: image/png, 2.0 KiB]"));
        assert!(screen.contains(&today));
        assert!(screen.contains("Entries (2)"));
    }

    #[test]
    fn attach_prompt_shows_the_typed_path() {
        let mut app = app_with(EntryStore::new());
        app.handle_key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL));
        for c in "~/cat.png".chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        let screen = render(&app);
        assert!(screen.contains("Path: ~/cat.png"));
        assert!(screen.contains("load image"));
    }

    #[test]
    fn long_lines_wrap_instead_of_being_cut_off() {
        let mut app = app_with(EntryStore::new());
        let long = format!("{}TAIL", "a".repeat(70));
        for c in long.chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        let screen = render(&app);
        assert!(screen.contains("TAIL"));
    }

    #[test]
    fn wrapping_tracks_the_cursor() {
        let (rows, cursor) = wrap_draft("abcdef", 0, 6, 4);
        assert_eq!(rows, vec!["abcd", "ef"]);
        assert_eq!(cursor, (1, 2));

        let (rows, cursor) = wrap_draft("abcd", 0, 4, 4);
        assert_eq!(rows, vec!["abcd"]);
        assert_eq!(cursor, (1, 0));

        let (rows, cursor) = wrap_draft("ab\ncdefg", 1, 1, 4);
        assert_eq!(rows, vec!["ab", "cdef", "g"]);
        assert_eq!(cursor, (1, 1));
    }

    #[test]
    fn wide_chars_wrap_by_display_width() {
        let (rows, cursor) = wrap_draft("日本語", 0, 2, 4);
        assert_eq!(rows, vec!["日本", "語"]);
        assert_eq!(cursor, (1, 0));
    }

    #[test]
    fn validation_feedback_is_visible() {
        let mut app = app_with(EntryStore::new());
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        let screen = render(&app);
        assert!(screen.contains("write something you are thankful for"));
    }
}
