use crate::gratitude_entry::{EncodedImage, EntryId, GratitudeEntry};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("write something you are thankful for before saving")]
    EmptyText,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub image: Option<EncodedImage>,
}

impl Draft {
    fn reset(&mut self) {
        self.text.clear();
        self.image = None;
    }
}

/// Saved entries (newest first) plus the draft being composed.
pub struct EntryStore {
    entries: Vec<GratitudeEntry>,
    draft: Draft,
    next_id: u64,
}

impl EntryStore {
    pub fn new() -> Self {
        EntryStore {
            entries: Vec::new(),
            draft: Draft::default(),
            next_id: 1,
        }
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn set_draft_image(&mut self, image: Option<EncodedImage>) {
        self.draft.image = image;
    }

    /// Turns the draft into an entry at the front of the list.
    ///
    /// Whitespace-only text is rejected and leaves the draft as it was. On
    /// success the text is stored untrimmed and the draft is cleared.
    pub fn submit(&mut self) -> Result<&GratitudeEntry, SubmitError> {
        if self.draft.text.trim().is_empty() {
            return Err(SubmitError::EmptyText);
        }

        let id = EntryId(self.next_id);
        self.next_id += 1;

        let entry = GratitudeEntry::new(
            id,
            std::mem::take(&mut self.draft.text),
            self.draft.image.take(),
        );
        self.draft.reset();
        self.entries.insert(0, entry);
        Ok(&self.entries[0])
    }

    pub fn entries(&self) -> &[GratitudeEntry] {
        &self.entries
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn texts(store: &EntryStore) -> Vec<&str> {
        store.entries().iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn saves_a_single_entry() {
        let mut store = EntryStore::new();
        store.set_draft_text("Grateful for sunshine");
        store.submit().unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].text, "Grateful for sunshine");
        assert!(store.entries()[0].image.is_none());
    }

    #[test]
    fn whitespace_only_text_is_rejected_without_side_effects() {
        for blank in ["", " ", "  ", "\n\t ", "\u{3000}"] {
            let mut store = EntryStore::new();
            let image = EncodedImage::new("image/png", "AAAA", 3);
            store.set_draft_text(blank);
            store.set_draft_image(Some(image.clone()));

            assert_eq!(store.submit().unwrap_err(), SubmitError::EmptyText);
            assert!(store.is_empty());
            assert_eq!(store.draft().text, blank);
            assert_eq!(store.draft().image, Some(image));
        }
    }

    #[test]
    fn keeps_the_untrimmed_text() {
        let mut store = EntryStore::new();
        store.set_draft_text("  my cat  \n");
        let entry = store.submit().unwrap();
        assert_eq!(entry.text, "  my cat  \n");
    }

    #[test]
    fn newest_entry_comes_first() {
        let mut store = EntryStore::new();
        store.set_draft_text("A");
        store.submit().unwrap();
        store.set_draft_text("B");
        store.submit().unwrap();

        assert_eq!(texts(&store), vec!["B", "A"]);
        assert!(store.entries()[0].created_at >= store.entries()[1].created_at);
    }

    #[test]
    fn ids_are_unique() {
        let mut store = EntryStore::new();
        for i in 0..50 {
            store.set_draft_text(format!("entry {}", i));
            store.submit().unwrap();
        }
        let ids: HashSet<EntryId> = store.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn draft_resets_after_submit() {
        let mut store = EntryStore::new();
        store.set_draft_text("with picture");
        store.set_draft_image(Some(EncodedImage::new("image/gif", "R0lG", 3)));
        store.submit().unwrap();
        assert_eq!(store.draft(), &Draft::default());

        store.set_draft_text("without picture");
        store.submit().unwrap();
        assert_eq!(store.draft(), &Draft::default());
    }

    #[test]
    fn attached_image_lands_in_the_entry() {
        let mut store = EntryStore::new();
        let image = EncodedImage::new("image/jpeg", "/9j/", 3);
        store.set_draft_text("picnic");
        store.set_draft_image(Some(image.clone()));
        let entry = store.submit().unwrap();
        assert_eq!(entry.image, Some(image));

        store.set_draft_text("no picture this time");
        let entry = store.submit().unwrap();
        assert!(entry.image.is_none());
    }

    #[test]
    fn clearing_the_image_detaches_it() {
        let mut store = EntryStore::new();
        store.set_draft_image(Some(EncodedImage::new("image/png", "AAAA", 3)));
        store.set_draft_image(None);
        store.set_draft_text("plain");
        assert!(store.submit().unwrap().image.is_none());
    }
}
