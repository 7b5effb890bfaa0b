// Level payload normalization.
//
// Every screen of a learnable contributes columns, attributes and cell data
// to the course model. Columns are registered on first sight and keep the
// type and side they were created with. Typing screens only add accepted
// answers to a column a presentation screen already registered. Screens are
// visited in key order, so a typing screen that comes before the matching
// presentation screen is dropped.

use chrono::{DateTime, NaiveDateTime, Utc};
use memrise_acquire::{
    LearnablePayload, PresentationScreen, ProgressEntry, Screen, ScreenField, TextField, TypingScreen,
};
use memrise_model::{
    AttributeData, AttributeName, ColumnData, ColumnName, Course, Direction, FieldType, Learnable,
    MediaColumnData, Progress, TextColumnData,
};

/// Comma-separated display values, trimmed, empty entries dropped.
pub fn split_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split alternatives into visible and hidden ones.
///
/// Hidden alternatives carry a leading underscore in the payload. It is
/// removed here and never reaches displayed text.
pub fn partition_alternatives(alternatives: &[String]) -> (Vec<String>, Vec<String>) {
    let mut visible = Vec::new();
    let mut hidden = Vec::new();

    for alternative in alternatives.iter().map(|a| a.trim()) {
        match alternative.strip_prefix('_') {
            Some(rest) if !rest.trim().is_empty() => hidden.push(rest.trim().to_string()),
            Some(_) => {}
            None if !alternative.is_empty() => visible.push(alternative.to_string()),
            None => {}
        }
    }

    (visible, hidden)
}

pub fn text_column_data(field: &TextField) -> TextColumnData {
    let (alternatives, hidden_alternatives) = partition_alternatives(&field.alternatives);
    TextColumnData {
        values: split_values(&field.value),
        alternatives,
        hidden_alternatives,
        typing_corrects: Vec::new(),
    }
}

fn field_type(field: &ScreenField) -> Option<FieldType> {
    match field {
        ScreenField::Text(_) => Some(FieldType::Text),
        ScreenField::Audio(_) => Some(FieldType::Audio),
        ScreenField::Image(_) => Some(FieldType::Image),
        ScreenField::Video(_) => Some(FieldType::Video),
        ScreenField::Unsupported => None,
    }
}

/// Register the columns and attributes of a presentation screen and fill in
/// the learnable's cells. `resolve_media` turns payload media paths into
/// absolute URLs.
pub fn apply_presentation(
    course: &mut Course,
    learnable: &mut Learnable,
    screen: &PresentationScreen,
    resolve_media: &dyn Fn(&str) -> String,
) {
    let front = screen.item.as_ref().and_then(ScreenField::label);
    let back = screen.definition.as_ref().and_then(ScreenField::label);
    if let (Some(front), Some(back)) = (front, back) {
        learnable.direction = Some(Direction::new(ColumnName::new(front), ColumnName::new(back)));
    }

    for field in screen.fields() {
        let (Some(label), Some(side), Some(kind)) = (field.label(), field.direction(), field_type(field))
        else {
            tracing::debug!(learnable = learnable.id, "Skipping unsupported field");
            continue;
        };

        let name = course.add_column(kind, ColumnName::new(label), side).name.clone();
        let data = match field {
            ScreenField::Text(text) => ColumnData::Text(text_column_data(text)),
            ScreenField::Audio(media) | ScreenField::Image(media) | ScreenField::Video(media) => {
                let urls = media
                    .value
                    .iter()
                    .map(|r| r.normal.trim())
                    .filter(|url| !url.is_empty())
                    .map(resolve_media);
                ColumnData::Media(MediaColumnData::new(kind, urls))
            }
            ScreenField::Unsupported => continue,
        };
        learnable.set_column_data(name, data);
    }

    for attribute in screen.attributes.iter().flatten() {
        let name = course.add_attribute(AttributeName::new(&attribute.label)).name.clone();
        learnable.set_attribute_data(
            name,
            AttributeData {
                values: split_values(&attribute.value),
            },
        );
    }
}

/// Add the accepted typed answers of a typing screen to those already known.
///
/// Returns false when the answer column is not known yet and the screen was
/// dropped.
pub fn apply_typing(course: &Course, learnable: &mut Learnable, screen: &TypingScreen) -> bool {
    let name = ColumnName::new(&screen.answer.label);
    if !course.has_column(&name) {
        tracing::debug!(
            learnable = learnable.id,
            column = %name,
            "Typing screen before its column, dropped"
        );
        return false;
    }

    let Some(text) = learnable.text_data_mut(&name) else {
        tracing::debug!(
            learnable = learnable.id,
            column = %name,
            "No text data for typing screen, dropped"
        );
        return false;
    };

    for answer in &screen.correct {
        if !answer.is_empty() && !text.typing_corrects.contains(answer) {
            text.typing_corrects.push(answer.clone());
        }
    }
    true
}

/// Apply every screen of a learnable payload in key order.
pub fn apply_screens(
    course: &mut Course,
    learnable: &mut Learnable,
    payload: &LearnablePayload,
    resolve_media: &dyn Fn(&str) -> String,
) {
    for (key, screen) in &payload.screens {
        match screen {
            Screen::Presentation(presentation) => {
                apply_presentation(course, learnable, presentation, resolve_media)
            }
            Screen::Typing(typing) => {
                apply_typing(course, learnable, typing);
            }
            Screen::Other => {
                tracing::trace!(learnable = learnable.id, screen = %key, "Ignoring screen template");
            }
        }
    }
}

/// Parse a progress timestamp as UTC.
///
/// Accepts RFC 3339 with `Z` or an offset, and timestamps without an offset,
/// which are taken to be UTC already.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    tracing::warn!(date = %raw, "Unparsable progress date");
    None
}

/// Overwrite learner progress from a payload entry. The import position is
/// kept.
pub fn apply_progress(progress: &mut Progress, entry: &ProgressEntry) {
    let attempts = entry.attempts.unwrap_or(0);
    let correct = entry.correct.unwrap_or(0);

    progress.ignored = entry.ignored;
    progress.last_date = entry.last_date.as_deref().and_then(parse_date);
    progress.created_date = entry.created_date.as_deref().and_then(parse_date);
    progress.next_date = entry.next_date.as_deref().and_then(parse_date);
    progress.interval = entry.interval;
    progress.growth_level = entry.growth_level.unwrap_or(0);
    progress.attempts = attempts;
    progress.correct = correct;
    progress.incorrect = attempts.saturating_sub(correct);
    progress.total_streak = entry.total_streak.unwrap_or(0);
    progress.current_streak = entry.current_streak.unwrap_or(0);
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use memrise_model::Side;
    use serde_json::json;

    use super::*;

    fn resolve(url: &str) -> String {
        format!("https://static.example/{}", url.trim_start_matches('/'))
    }

    fn sample_learnable(screens: serde_json::Value) -> LearnablePayload {
        serde_json::from_value(json!({"id": 42, "screens": screens})).unwrap()
    }

    fn sample_presentation() -> serde_json::Value {
        json!({
            "template": "presentation",
            "item": {"kind": "text", "label": "Spanish", "direction": "source",
                     "value": "hola", "alternatives": ["ola", "_holà", "", "_"]},
            "definition": {"kind": "text", "label": "<b>English</b>", "direction": "target",
                           "value": "hello,  hi ,", "alternatives": []},
            "audio": {"kind": "audio", "label": "Audio", "direction": "source",
                      "value": [{"normal": "uploads/a.mp3"}, {"normal": ""}]},
            "visible_info": [{"kind": "image", "label": "Picture", "direction": "target",
                              "value": [{"normal": "uploads/p.jpg"}]}],
            "attributes": [null, {"label": "Part of Speech", "value": "interjection, greeting"}]
        })
    }

    #[test]
    fn test_split_values() {
        assert_eq!(split_values(" hello,  hi ,"), vec!["hello", "hi"]);
        assert!(split_values("").is_empty());
    }

    #[test]
    fn test_partition_alternatives() {
        let alternatives = ["ola", "_holà", "", "_", " _secret "].map(String::from);
        let (visible, hidden) = partition_alternatives(&alternatives);
        assert_eq!(visible, vec!["ola"]);
        assert_eq!(hidden, vec!["holà", "secret"]);
    }

    #[test]
    fn test_presentation_registers_columns_and_data() {
        let mut course = Course::new(1);
        let mut learnable = Learnable::new(42, 1);
        let payload = sample_learnable(json!({"1": sample_presentation()}));

        apply_screens(&mut course, &mut learnable, &payload, &resolve);

        let spanish = ColumnName::new("Spanish");
        let english = ColumnName::new("English");
        assert_eq!(
            learnable.direction,
            Some(Direction::new(spanish.clone(), english.clone()))
        );
        assert_eq!(course.count_columns(), 4);
        assert_eq!(course.column_by_name(&english).unwrap().side, Side::Target);
        assert_eq!(course.count_columns_with_type(FieldType::Image), 1);

        assert_eq!(learnable.definitions(&spanish), ["hola"]);
        assert_eq!(learnable.alternatives(&spanish), ["ola"]);
        assert_eq!(learnable.hidden_alternatives(&spanish), ["holà"]);
        assert_eq!(learnable.definitions(&english), ["hello", "hi"]);

        let audio = learnable.media_data(&ColumnName::new("Audio")).unwrap();
        assert_eq!(audio.remote_urls(), vec!["https://static.example/uploads/a.mp3"]);

        let pos = AttributeName::new("Part of Speech");
        assert!(course.has_attribute(&pos));
        assert_eq!(learnable.attributes(&pos), ["interjection", "greeting"]);
    }

    #[test]
    fn test_typing_after_presentation_sets_corrects() {
        let mut course = Course::new(1);
        let mut learnable = Learnable::new(42, 1);
        let payload = sample_learnable(json!({
            "1": sample_presentation(),
            "2": {"template": "typing", "answer": {"label": "Spanish"}, "correct": ["hola", "", "ola"]}
        }));

        apply_screens(&mut course, &mut learnable, &payload, &resolve);
        assert_eq!(
            learnable.typing_corrects(&ColumnName::new("Spanish")),
            ["hola", "ola"]
        );
    }

    #[test]
    fn test_typing_screens_accumulate_corrects() {
        let mut course = Course::new(1);
        let mut learnable = Learnable::new(42, 1);
        let payload = sample_learnable(json!({
            "1": sample_presentation(),
            "2": {"template": "typing", "answer": {"label": "Spanish"}, "correct": ["hola", ""]},
            "3": {"template": "typing", "answer": {"label": "Spanish"}, "correct": ["ola", "hola"]}
        }));

        apply_screens(&mut course, &mut learnable, &payload, &resolve);
        assert_eq!(
            learnable.typing_corrects(&ColumnName::new("Spanish")),
            ["hola", "ola"]
        );
    }

    #[test]
    fn test_typing_before_column_is_dropped() {
        let mut course = Course::new(1);
        let mut learnable = Learnable::new(42, 1);
        let payload = sample_learnable(json!({
            "0": {"template": "typing", "answer": {"label": "Spanish"}, "correct": ["hola"]},
            "1": sample_presentation()
        }));

        apply_screens(&mut course, &mut learnable, &payload, &resolve);
        assert!(learnable.typing_corrects(&ColumnName::new("Spanish")).is_empty());
    }

    #[test]
    fn test_first_seen_column_wins() {
        let mut course = Course::new(1);
        let mut first = Learnable::new(1, 1);
        apply_screens(
            &mut course,
            &mut first,
            &sample_learnable(json!({"1": sample_presentation()})),
            &resolve,
        );

        let mut flipped = sample_presentation();
        flipped["item"]["direction"] = json!("target");
        let mut second = Learnable::new(2, 1);
        apply_screens(&mut course, &mut second, &sample_learnable(json!({"1": flipped})), &resolve);

        assert_eq!(course.count_columns(), 4);
        assert_eq!(
            course.column_by_name(&ColumnName::new("Spanish")).unwrap().side,
            Side::Source
        );
    }

    #[test]
    fn test_reapplying_is_idempotent() {
        let mut course = Course::new(1);
        let mut learnable = Learnable::new(42, 1);
        let payload = sample_learnable(json!({
            "1": sample_presentation(),
            "2": {"template": "typing", "answer": {"label": "Spanish"}, "correct": ["hola"]}
        }));

        apply_screens(&mut course, &mut learnable, &payload, &resolve);
        let columns = course.columns().to_vec();
        let attributes = course.attributes().to_vec();
        let checksum = learnable.checksum();
        let corrects = learnable.typing_corrects(&ColumnName::new("Spanish")).to_vec();

        apply_screens(&mut course, &mut learnable, &payload, &resolve);
        assert_eq!(course.columns(), columns.as_slice());
        assert_eq!(course.attributes(), attributes.as_slice());
        assert_eq!(learnable.checksum(), checksum);
        assert_eq!(learnable.typing_corrects(&ColumnName::new("Spanish")), corrects.as_slice());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 4, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_date("2023-04-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_date("2023-04-01T10:00:00+00:00"), Some(expected));
        assert_eq!(parse_date("2023-04-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_date("2023-04-01T10:00:00"), Some(expected));
        assert_eq!(parse_date("2023-04-01 10:00:00.000"), Some(expected));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_apply_progress() {
        let entry: ProgressEntry = serde_json::from_value(json!({
            "learnable_id": 42,
            "ignored": true,
            "next_date": "2023-04-05T10:00:00Z",
            "interval": 4.5,
            "growth_level": 3,
            "attempts": 2,
            "correct": 5,
            "current_streak": 1
        }))
        .unwrap();

        let mut progress = Progress {
            position: 7,
            ..Progress::default()
        };
        apply_progress(&mut progress, &entry);

        assert!(progress.ignored);
        assert_eq!(progress.position, 7);
        assert_eq!(progress.interval, Some(4.5));
        assert_eq!(progress.growth_level, 3);
        assert_eq!(progress.incorrect, 0);
        assert_eq!(progress.total_streak, 0);
        assert_eq!(progress.last_date, None);
        assert!(progress.next_date.is_some());
    }
}
