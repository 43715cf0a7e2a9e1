//! Notes module: personal notes, scoped to their owner

pub mod service;

pub use service::{NoteDraft, NoteEdit, NoteService};
