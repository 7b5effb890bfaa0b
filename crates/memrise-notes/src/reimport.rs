// Folding a fresh import into the notes written by an earlier one.
//
// Notes are matched on the learnable they came from. A matched note takes
// the fresh field values but keeps the levels and tags it already had, and
// keeps its review state when the schedule is not imported. Notes that the
// fresh import no longer produces are kept as they were.

use serde::{Deserialize, Serialize};

use crate::model::LEVEL_FIELD;
use crate::notes::{NoteRecord, NoteSet};
use crate::render::VALUE_SEPARATOR;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReimportStats {
    /// Notes found in the earlier import and refreshed.
    pub updated: usize,
    pub added: usize,
    /// Earlier notes the fresh import did not touch.
    pub kept: usize,
}

fn same_learnable(earlier: &NoteRecord, fresh: &NoteRecord) -> bool {
    earlier.learnable_id == fresh.learnable_id || !earlier.identifiers.is_disjoint(&fresh.identifiers)
}

/// Union of two `Level` field values, in numeric order.
pub fn merge_level_values(earlier: &str, fresh: &str) -> String {
    let mut levels: Vec<&str> = Vec::new();
    for level in earlier.split(',').chain(fresh.split(',')).map(str::trim) {
        if !level.is_empty() && !levels.contains(&level) {
            levels.push(level);
        }
    }
    levels.sort_by_key(|level| (level.parse::<u32>().unwrap_or(u32::MAX), level.to_string()));
    levels.join(VALUE_SEPARATOR)
}

fn fold_earlier(note: &mut NoteRecord, earlier: NoteRecord, import_schedule: bool) {
    note.identifiers.extend(earlier.identifiers);

    if let Some(earlier_level) = earlier
        .fields
        .iter()
        .find(|f| f.name == LEVEL_FIELD)
        .map(|f| f.value.as_str())
    {
        if let Some(level) = note.fields.iter_mut().find(|f| f.name == LEVEL_FIELD) {
            level.value = merge_level_values(earlier_level, &level.value);
        }
    }

    for tag in earlier.tags {
        if !note.tags.contains(&tag) {
            note.tags.push(tag);
        }
    }

    if !import_schedule {
        note.schedule = earlier.schedule;
        note.suspended = earlier.suspended;
    }
}

/// Fold `fresh` into the notes of an earlier import.
///
/// The result uses the fresh note model. Fresh notes come first, in import
/// order, followed by the untouched earlier ones.
pub fn merge_previous(earlier: NoteSet, fresh: NoteSet, import_schedule: bool) -> (NoteSet, ReimportStats) {
    let mut stats = ReimportStats::default();
    let mut remaining: Vec<Option<NoteRecord>> = earlier.notes.into_iter().map(Some).collect();
    let mut notes = Vec::with_capacity(fresh.notes.len() + remaining.len());

    for mut note in fresh.notes {
        let matched = remaining
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|old| same_learnable(old, &note)))
            .and_then(|index| remaining[index].take());
        match matched {
            Some(old) => {
                fold_earlier(&mut note, old, import_schedule);
                stats.updated += 1;
            }
            None => stats.added += 1,
        }
        notes.push(note);
    }

    for old in remaining.into_iter().flatten() {
        stats.kept += 1;
        notes.push(old);
    }

    tracing::debug!(
        updated = stats.updated,
        added = stats.added,
        kept = stats.kept,
        "Folded earlier import"
    );
    (
        NoteSet {
            model: fresh.model,
            notes,
        },
        stats,
    )
}
