use std::collections::BTreeSet;

use chrono::NaiveDate;
use memrise_model::{Course, Learnable};
use serde::{Deserialize, Serialize};

use crate::model::NoteModel;
use crate::render::render_field;
use crate::schedule::{schedule_for, CardSchedule};
use crate::tags::{level_tags, DEFAULT_MIN_LEVEL_TAG_WIDTH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteOptions {
    /// Narrowest zero padding of the `Level` tag.
    pub min_level_tag_width: usize,
    /// Carry review history over. Otherwise every card starts new.
    pub import_schedule: bool,
}

impl Default for NoteOptions {
    fn default() -> Self {
        Self {
            min_level_tag_width: DEFAULT_MIN_LEVEL_TAG_WIDTH,
            import_schedule: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: String,
}

/// One learnable as a note with a single card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub learnable_id: u64,
    /// Every id the learnable was merged from.
    pub identifiers: BTreeSet<u64>,
    /// Name of the card template the note's card uses.
    pub template: Option<String>,
    pub fields: Vec<FieldValue>,
    pub tags: Vec<String>,
    pub schedule: CardSchedule,
    pub suspended: bool,
}

impl NoteRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSet {
    pub model: NoteModel,
    pub notes: Vec<NoteRecord>,
}

/// Map every learnable of `course` onto a note, level by level.
pub fn build_notes(course: &Course, options: &NoteOptions, today: NaiveDate) -> NoteSet {
    let model = NoteModel::for_course(course);
    let mut notes = Vec::with_capacity(course.learnable_count());

    for level in course.levels() {
        let tags = level_tags(course.level_count(), level, options.min_level_tag_width);
        for learnable in level.learnables() {
            notes.push(build_note(&model, learnable, &tags, options, today));
        }
    }

    tracing::debug!(
        model = %model.name,
        notes = notes.len(),
        templates = model.templates.len(),
        "Mapped course to notes"
    );
    NoteSet { model, notes }
}

fn build_note(
    model: &NoteModel,
    learnable: &Learnable,
    tags: &[String],
    options: &NoteOptions,
    today: NaiveDate,
) -> NoteRecord {
    let fields = model
        .fields
        .iter()
        .map(|field| FieldValue {
            name: field.name.clone(),
            value: render_field(learnable, &field.source),
        })
        .collect();

    let template = learnable
        .direction
        .as_ref()
        .and_then(|direction| model.template_for(direction))
        .map(|template| template.name.clone());

    let (schedule, suspended) = if options.import_schedule {
        (schedule_for(&learnable.progress, today), learnable.progress.ignored)
    } else {
        (
            CardSchedule::New {
                due: learnable.progress.position,
            },
            false,
        )
    };

    NoteRecord {
        learnable_id: learnable.id,
        identifiers: learnable.identifiers.clone(),
        template,
        fields,
        tags: tags.to_vec(),
        schedule,
        suspended,
    }
}
