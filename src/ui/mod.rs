//! Ratatui form surface: the draft editor, the saved-workout list for the
//! selected day, and the terminal event loop.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::{App, Focus};
pub use terminal::run_app;
