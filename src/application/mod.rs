pub mod identity;
pub mod notes;

pub use identity::{
    start_session_cleanup_task, AccountChanges, AuthResult, NewAccount, UserService,
};
pub use notes::{NoteDraft, NoteEdit, NoteService};
