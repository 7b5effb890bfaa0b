use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use memrise_model::Course;

use crate::notes::{NoteOptions, NoteSet};
use crate::reimport::{merge_previous, ReimportStats};

const NOTES_FILE: &str = "notes.json";

/// Write the mapped course to `output_dir`.
///
/// Creates the directory if it doesn't exist, then writes:
/// - `notes.json`: note model and note records
/// - `course.json`: the loaded course
/// - `source.md`: provenance
pub fn write_notes(course: &Course, notes: &NoteSet, source_url: &str, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let path = output_dir.join(NOTES_FILE);
    fs::write(&path, serde_json::to_string_pretty(notes)?)?;
    tracing::info!(path = %path.display(), notes = notes.notes.len(), "Wrote notes");

    let path = output_dir.join("course.json");
    fs::write(&path, serde_json::to_string_pretty(course)?)?;
    tracing::info!(
        path = %path.display(),
        levels = course.level_count(),
        learnables = course.learnable_count(),
        "Wrote course"
    );

    let path = output_dir.join("source.md");
    fs::write(&path, source_md(course, notes, source_url))?;
    tracing::info!(path = %path.display(), "Wrote source provenance");

    Ok(())
}

/// Notes of an earlier import in `output_dir`, if there are any.
pub fn read_previous_notes(output_dir: &Path) -> Result<Option<NoteSet>> {
    let path = output_dir.join(NOTES_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let notes: NoteSet =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    tracing::info!(path = %path.display(), notes = notes.notes.len(), "Found earlier import");
    Ok(Some(notes))
}

/// Like [`write_notes`], folding `notes` into an earlier import in the same
/// directory instead of replacing it.
pub fn update_notes(
    course: &Course,
    notes: NoteSet,
    options: &NoteOptions,
    source_url: &str,
    output_dir: &Path,
) -> Result<ReimportStats> {
    let (notes, stats) = match read_previous_notes(output_dir)? {
        Some(earlier) => merge_previous(earlier, notes, options.import_schedule),
        None => {
            let added = notes.notes.len();
            (notes, ReimportStats { added, ..ReimportStats::default() })
        }
    };
    write_notes(course, &notes, source_url, output_dir)?;
    tracing::info!(
        updated = stats.updated,
        added = stats.added,
        kept = stats.kept,
        "Updated notes"
    );
    Ok(stats)
}

fn source_md(course: &Course, notes: &NoteSet, source_url: &str) -> String {
    let mut md = String::from("# Source\n\n");
    md.push_str(&format!("- **Course:** {}\n", course.title));
    md.push_str(&format!("- **URL:** {source_url}\n"));
    md.push_str(&format!("- **Fetched:** {}\n", chrono::Utc::now().to_rfc3339()));
    md.push_str(&format!("- **Levels:** {}\n", course.level_count()));
    md.push_str(&format!("- **Learnables:** {}\n", course.learnable_count()));
    md.push_str(&format!("- **Note type:** {}\n", notes.model.name));
    if !course.description.is_empty() {
        md.push_str(&format!("\n{}\n", course.description));
    }
    md
}
