//! Local persistence for user preferences

pub mod selection;

pub use selection::{SELECTION_KEY, SelectionStore};
