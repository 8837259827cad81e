//! Tabbed terminal front-end: one table per entity plus add/edit/delete
//! dialogs driven by each manager's field schema.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
