//! Editor state machines driven by the session: tools, history and keyboard shortcuts.

pub mod history;
pub mod shortcuts;
pub mod tools;
