//! Note aggregate

pub mod model;
pub mod repository;

pub use model::{normalize_title, Note, NoteChanges, NewNote, DEFAULT_NOTE_TITLE};
pub use repository::NoteRepository;
