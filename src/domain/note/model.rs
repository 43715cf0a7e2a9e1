//! Note domain entity

use chrono::{DateTime, Utc};

/// Title stored when the owner leaves it blank.
pub const DEFAULT_NOTE_TITLE: &str = "Untitled";

/// Personal note, visible to its owner only
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: i32,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Case-insensitive substring match on title or content.
    /// `needle` must already be lower-cased.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }

    pub fn apply(&mut self, changes: &NoteChanges, now: DateTime<Utc>) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(content) = &changes.content {
            self.content = content.clone();
        }
        self.updated_at = now;
    }
}

/// Trim a title and fall back to [`DEFAULT_NOTE_TITLE`] when nothing is left.
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_NOTE_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Note to insert; the repository assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewNote {
    pub owner_id: String,
    pub title: String,
    pub content: String,
}

/// Field changes for an update, already normalized
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        Note {
            id: 1,
            owner_id: "owner-1".into(),
            title: "Shopping".into(),
            content: "Milk, eggs".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn blank_title_becomes_untitled() {
        assert_eq!(normalize_title(""), "Untitled");
        assert_eq!(normalize_title("   \t"), "Untitled");
        assert_eq!(normalize_title("  Ideas "), "Ideas");
    }

    #[test]
    fn ownership_check() {
        let note = sample_note();
        assert!(note.is_owned_by("owner-1"));
        assert!(!note.is_owned_by("owner-2"));
    }

    #[test]
    fn matches_title_and_content() {
        let note = sample_note();
        assert!(note.matches("shop"));
        assert!(note.matches("eggs"));
        assert!(!note.matches("bread"));
    }

    #[test]
    fn apply_keeps_absent_fields() {
        let mut note = sample_note();
        let later = note.updated_at + chrono::Duration::seconds(5);
        note.apply(
            &NoteChanges {
                title: None,
                content: Some("Bread".into()),
            },
            later,
        );
        assert_eq!(note.title, "Shopping");
        assert_eq!(note.content, "Bread");
        assert_eq!(note.updated_at, later);
    }
}
