// Shared fixture for the mapping tests.

use chrono::{TimeZone, Utc};
use memrise_model::{
    AttributeData, AttributeName, ColumnData, ColumnName, Course, Direction, FieldType, Learnable,
    Level, MediaColumnData, Side, TextColumnData,
};

fn text(values: &[&str], alternatives: &[&str], hidden: &[&str], corrects: &[&str]) -> ColumnData {
    let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
    ColumnData::Text(TextColumnData {
        values: owned(values),
        alternatives: owned(alternatives),
        hidden_alternatives: owned(hidden),
        typing_corrects: owned(corrects),
    })
}

/// Two-learnable course: `10` is Spanish -> English and never studied,
/// `11` is English -> Spanish with review history and ignored.
pub(crate) fn sample_course() -> Course {
    let spanish = ColumnName::new("Spanish");
    let english = ColumnName::new("English");
    let audio = ColumnName::new("Audio");
    let picture = ColumnName::new("Picture");
    let pos = AttributeName::new("Part of Speech");

    let mut course = Course::new(9);
    course.set_title("Basic Spanish");
    course.add_column(FieldType::Text, spanish.clone(), Side::Source);
    course.add_column(FieldType::Text, english.clone(), Side::Target);
    course.add_column(FieldType::Audio, audio.clone(), Side::Source);
    course.add_column(FieldType::Image, picture.clone(), Side::Target);
    course.add_attribute(pos.clone());

    let mut forward = Learnable::new(10, 9);
    forward.direction = Some(Direction::new(spanish.clone(), english.clone()));
    forward.progress.position = 1;
    forward.set_column_data(spanish.clone(), text(&["hola"], &["ola"], &["holà"], &["hola", "ola"]));
    forward.set_column_data(english.clone(), text(&["hello", "hi <there>"], &[], &[], &[]));
    let mut sound = MediaColumnData::new(
        FieldType::Audio,
        ["https://static.memrise.com/a.mp3".to_string(), "https://static.memrise.com/b.mp3".to_string()],
    );
    sound.files[0].local_url = Some("a.mp3".to_string());
    forward.set_column_data(audio, ColumnData::Media(sound));
    forward.set_column_data(
        picture.clone(),
        ColumnData::Media(MediaColumnData::new(
            FieldType::Image,
            ["https://static.memrise.com/p.jpg".to_string()],
        )),
    );
    forward.set_attribute_data(
        pos,
        AttributeData {
            values: vec!["interjection".to_string()],
        },
    );

    let mut backward = Learnable::new(11, 9);
    backward.direction = Some(Direction::new(english.clone(), spanish.clone()));
    backward.progress.position = 2;
    backward.progress.interval = Some(3.6);
    backward.progress.attempts = 5;
    backward.progress.correct = 3;
    backward.progress.incorrect = 2;
    backward.progress.ignored = true;
    backward.progress.next_date = Some(Utc.with_ymd_and_hms(2024, 3, 14, 8, 30, 0).unwrap());
    backward.set_column_data(english, text(&["goodbye"], &[], &[], &[]));
    backward.set_column_data(spanish, text(&["adiós"], &[], &[], &[]));
    let mut image = MediaColumnData::new(FieldType::Image, ["https://static.memrise.com/q.jpg".to_string()]);
    image.files[0].local_url = Some("q.jpg".to_string());
    backward.set_column_data(picture, ColumnData::Media(image));

    let mut level = Level::new(501, 1, "Greetings", 9);
    level.add_learnable(forward);
    level.add_learnable(backward);
    course.push_level(level);
    course
}
