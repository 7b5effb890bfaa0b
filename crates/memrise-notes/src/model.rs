use memrise_model::{AttributeName, ColumnName, Course, Direction, FieldType};
use serde::{Deserialize, Serialize};

pub const MODEL_NAME_PREFIX: &str = "Memrise";
pub const LEVEL_FIELD: &str = "Level";
pub const LEARNABLE_FIELD: &str = "Learnable";

const MODEL_CSS: &str = ".card {\n font-family: arial;\n font-size: 20px;\n text-align: center;\n}\n\
.alts {\n font-size: 14px;\n}\n\
.attrs {\n font-style: italic;\n font-size: 14px;\n}\n";

/// Which part of a learnable a note field is filled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum FieldSource {
    Definitions(ColumnName),
    Alternatives(ColumnName),
    HiddenAlternatives(ColumnName),
    TypingCorrects(ColumnName),
    Attribute(AttributeName),
    Images(ColumnName),
    Audio(ColumnName),
    Video(ColumnName),
    Level,
    Learnable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteField {
    pub name: String,
    pub source: FieldSource,
}

/// One card per study direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    /// `"front -> back"`.
    pub name: String,
    pub direction: Direction,
    pub question_format: String,
    pub answer_format: String,
}

/// The note type a course is imported with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteModel {
    pub name: String,
    pub fields: Vec<NoteField>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
}

impl NoteModel {
    /// Default note model for a course.
    ///
    /// Field order: four fields per text column (values, alternatives,
    /// hidden alternatives, typing corrects), then attributes, image, audio
    /// and video columns, then `Level` and `Learnable`.
    pub fn for_course(course: &Course) -> Self {
        let mut fields = Vec::new();

        for name in course.column_names_by_type(FieldType::Text) {
            fields.push(NoteField {
                name: name.to_string(),
                source: FieldSource::Definitions(name.clone()),
            });
            fields.push(NoteField {
                name: alternatives_field(name),
                source: FieldSource::Alternatives(name.clone()),
            });
            fields.push(NoteField {
                name: format!("{name} Hidden Alternatives"),
                source: FieldSource::HiddenAlternatives(name.clone()),
            });
            fields.push(NoteField {
                name: format!("{name} Typing Corrects"),
                source: FieldSource::TypingCorrects(name.clone()),
            });
        }
        for attribute in course.attribute_names() {
            fields.push(NoteField {
                name: attribute.to_string(),
                source: FieldSource::Attribute(attribute.clone()),
            });
        }
        for (field_type, source) in [
            (FieldType::Image, FieldSource::Images as fn(ColumnName) -> FieldSource),
            (FieldType::Audio, FieldSource::Audio),
            (FieldType::Video, FieldSource::Video),
        ] {
            for name in course.column_names_by_type(field_type) {
                fields.push(NoteField {
                    name: name.to_string(),
                    source: source(name.clone()),
                });
            }
        }
        fields.push(NoteField {
            name: LEVEL_FIELD.to_string(),
            source: FieldSource::Level,
        });
        fields.push(NoteField {
            name: LEARNABLE_FIELD.to_string(),
            source: FieldSource::Learnable,
        });

        let templates = course
            .directions()
            .into_iter()
            .map(|direction| CardTemplate::for_direction(course, direction))
            .collect();

        Self {
            name: format!("{MODEL_NAME_PREFIX} - {}", course.title),
            fields,
            templates,
            css: MODEL_CSS.to_string(),
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn template_for(&self, direction: &Direction) -> Option<&CardTemplate> {
        self.templates.iter().find(|t| &t.direction == direction)
    }
}

impl CardTemplate {
    /// Question shows the front with every other text column and attribute;
    /// answer adds the back. Images go with whichever side is not the
    /// course's first text column, audio with the other.
    pub fn for_direction(course: &Course, direction: Direction) -> Self {
        let front = &direction.front;
        let back = &direction.back;
        let text_columns = course.column_names_by_type(FieldType::Text);
        let is_text = |name: &ColumnName| text_columns.contains(&name);
        let other = |name: &&ColumnName| *name != front && *name != back;

        let mut question = format!("{{{{{front}}}}}\n");
        if is_text(front) {
            question.push_str(&conditional_alts(&alternatives_field(front)));
        }
        for name in text_columns.iter().copied().filter(other) {
            question.push_str(&format!("<br />{{{{{name}}}}}\n"));
            question.push_str(&conditional_alts(&alternatives_field(name)));
        }
        for attribute in course.attribute_names() {
            if attribute.as_str() == front.as_str() || attribute.as_str() == back.as_str() {
                continue;
            }
            question.push_str(&format!(
                "{{{{#{attribute}}}}}<br /><span class=\"attrs\">({{{{{attribute}}}}})</span>{{{{/{attribute}}}}}\n"
            ));
        }

        let mut answer = format!("{{{{FrontSide}}}}\n\n<hr id=\"answer\" />\n\n{{{{{back}}}}}\n");
        if is_text(back) {
            answer.push_str(&conditional_alts(&alternatives_field(back)));
        }

        let front_is_first_text = text_columns.first().is_some_and(|first| *first == front);
        let (image_side, audio_side) = if front_is_first_text {
            (&mut answer, &mut question)
        } else {
            (&mut question, &mut answer)
        };
        for name in course.column_names_by_type(FieldType::Image).into_iter().filter(other) {
            image_side.push_str(&format!("{{{{#{name}}}}}<br />{{{{{name}}}}}{{{{/{name}}}}}\n"));
        }
        for field_type in [FieldType::Audio, FieldType::Video] {
            for name in course.column_names_by_type(field_type).into_iter().filter(other) {
                audio_side.push_str(&format!(
                    "{{{{#{name}}}}}<div style=\"display:none;\">{{{{{name}}}}}</div>{{{{/{name}}}}}\n"
                ));
            }
        }

        Self {
            name: direction.to_string(),
            direction,
            question_format: question,
            answer_format: answer,
        }
    }
}

fn alternatives_field(name: &ColumnName) -> String {
    format!("{name} Alternatives")
}

fn conditional_alts(field: &str) -> String {
    format!("{{{{#{field}}}}}<br /><span class=\"alts\">{{{{{field}}}}}</span>{{{{/{field}}}}}\n")
}
