use crate::entry_store::EntryStore;
use crate::image_loader::{ImageLoaded, ImageLoader, LoadResolution};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compose,
    AttachPrompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// Everything the screen shows, and the only place key events land.
pub struct App {
    store: EntryStore,
    loader: ImageLoader,
    mode: Mode,
    /// Char index into the draft text.
    cursor: usize,
    attach_path: String,
    scroll: usize,
    status: Option<Status>,
    date_format: String,
    should_quit: bool,
}

impl App {
    pub fn new(store: EntryStore, loader: ImageLoader, date_format: String) -> Self {
        App {
            store,
            loader,
            mode: Mode::Compose,
            cursor: 0,
            attach_path: String::new(),
            scroll: 0,
            status: None,
            date_format,
            should_quit: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.mode {
            Mode::Compose => self.handle_compose_key(key),
            Mode::AttachPrompt => self.handle_attach_key(key),
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => self.submit(),
                KeyCode::Char('o') => {
                    self.mode = Mode::AttachPrompt;
                    self.attach_path.clear();
                }
                KeyCode::Char('r') => self.remove_image(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Enter => self.insert_char('\n'),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_char_at_cursor();
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.draft_len() {
                    self.remove_char_at_cursor();
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.draft_len()),
            KeyCode::Home => {
                let (line, _) = self.cursor_line_col();
                self.cursor = char_index(&self.store.draft().text, line, 0);
            }
            KeyCode::End => {
                let (line, _) = self.cursor_line_col();
                self.cursor = char_index(&self.store.draft().text, line, usize::MAX);
            }
            KeyCode::Up => {
                let (line, col) = self.cursor_line_col();
                if line > 0 {
                    self.cursor = char_index(&self.store.draft().text, line - 1, col);
                }
            }
            KeyCode::Down => {
                let (line, col) = self.cursor_line_col();
                if line + 1 < self.store.draft().text.split('\n').count() {
                    self.cursor = char_index(&self.store.draft().text, line + 1, col);
                }
            }
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageDown => {
                self.scroll = (self.scroll + 1).min(self.store.len().saturating_sub(1));
            }
            _ => {}
        }
    }

    fn handle_attach_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Compose;
                self.attach_path.clear();
            }
            KeyCode::Enter => {
                self.mode = Mode::Compose;
                let path = expand_path(self.attach_path.trim());
                self.attach_path.clear();
                match self.loader.load(path) {
                    Some(ticket) => {
                        debug!(generation = ticket.generation, "image load started");
                        self.status = Some(Status::Info(format!(
                            "Loading {}...",
                            ticket.path.display()
                        )));
                    }
                    None => self.status = None,
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.attach_path.push(c);
            }
            KeyCode::Backspace => {
                self.attach_path.pop();
            }
            _ => {}
        }
    }

    pub fn on_image_loaded(&mut self, loaded: ImageLoaded) {
        match self.loader.resolve(loaded) {
            LoadResolution::Ready(image) => {
                self.status = Some(Status::Info(format!("Attached {}", image.summary())));
                self.store.set_draft_image(Some(image));
            }
            LoadResolution::Failed(e) => {
                self.status = Some(Status::Error(format!("Could not attach image: {}", e)));
            }
            LoadResolution::Stale => {}
        }
    }

    fn submit(&mut self) {
        match self.store.submit() {
            Ok(entry) => {
                info!(
                    id = %entry.id,
                    chars = entry.text.chars().count(),
                    image = entry.image.is_some(),
                    "entry saved"
                );
                let id = entry.id;
                self.cursor = 0;
                self.scroll = 0;
                self.status = Some(Status::Info(if self.loader.is_pending() {
                    format!("Entry {} saved, image still loading for the next entry", id)
                } else {
                    format!("Entry {} saved", id)
                }));
            }
            Err(e) => {
                debug!(error = %e, "submission rejected");
                self.status = Some(Status::Error(e.to_string()));
            }
        }
    }

    fn remove_image(&mut self) {
        let had_image = self.store.draft().image.is_some() || self.loader.is_pending();
        self.loader.invalidate();
        self.store.set_draft_image(None);
        if had_image {
            self.status = Some(Status::Info("Image removed".to_string()));
        }
    }

    fn insert_char(&mut self, c: char) {
        let mut text = self.store.draft().text.clone();
        let at = byte_index(&text, self.cursor);
        text.insert(at, c);
        self.store.set_draft_text(text);
        self.cursor += 1;
    }

    fn remove_char_at_cursor(&mut self) {
        let mut text = self.store.draft().text.clone();
        let at = byte_index(&text, self.cursor);
        text.remove(at);
        self.store.set_draft_text(text);
    }

    fn draft_len(&self) -> usize {
        self.store.draft().text.chars().count()
    }

    /// Zero-based line and char column of the cursor in the draft.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.store.draft().text.chars().take(self.cursor).collect();
        let line = before.matches('\n').count();
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
        (line, col)
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn attach_path(&self) -> &str {
        &self.attach_path
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn is_loading_image(&self) -> bool {
        self.loader.is_pending()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map_or(text.len(), |(i, _)| i)
}

/// Char index of `col` on `line`, clamped to the line's length.
fn char_index(text: &str, line: usize, col: usize) -> usize {
    let mut idx = 0;
    for (n, l) in text.split('\n').enumerate() {
        let len = l.chars().count();
        if n == line {
            return idx + col.min(len);
        }
        idx += len + 1;
    }
    text.chars().count()
}

fn expand_path(raw: &str) -> Option<PathBuf> {
    if raw.is_empty() {
        return None;
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Some(home.join(rest));
        }
    }
    Some(PathBuf::from(raw))
}
