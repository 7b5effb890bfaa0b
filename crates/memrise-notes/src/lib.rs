//! Maps a loaded course onto flashcard notes: one note type per course, one
//! card template per study direction, one note per learnable.

pub mod model;
pub mod notes;
pub mod output;
pub mod reimport;
pub mod render;
pub mod schedule;
pub mod tags;

#[cfg(test)]
mod testing;

pub use model::{CardTemplate, FieldSource, NoteField, NoteModel};
pub use notes::{build_notes, FieldValue, NoteOptions, NoteRecord, NoteSet};
pub use output::{read_previous_notes, update_notes, write_notes};
pub use reimport::{merge_previous, ReimportStats};
pub use schedule::{schedule_for, CardSchedule};
