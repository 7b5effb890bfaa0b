use memrise_model::Learnable;

use crate::model::FieldSource;

/// Separator between multiple values in one note field.
pub const VALUE_SEPARATOR: &str = ", ";

/// Escape text for an HTML note field. Quotes are escaped too.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn prepare_text(text: &str) -> String {
    escape_html(text.trim())
}

pub fn prepare_image(src: &str) -> String {
    format!("<img src=\"{src}\">")
}

pub fn prepare_audio(src: &str) -> String {
    format!("[sound:{src}]")
}

/// Rendered values of one field, empty ones dropped. Media fields only
/// reference files that were downloaded.
pub fn field_values(learnable: &Learnable, source: &FieldSource) -> Vec<String> {
    let texts = |values: &[String]| -> Vec<String> {
        values
            .iter()
            .map(|v| prepare_text(v))
            .filter(|v| !v.is_empty())
            .collect()
    };
    let media = |files: Vec<&str>, prepare: fn(&str) -> String| -> Vec<String> {
        files.into_iter().filter(|f| !f.is_empty()).map(prepare).collect()
    };

    match source {
        FieldSource::Definitions(name) => texts(learnable.definitions(name)),
        FieldSource::Alternatives(name) => texts(learnable.alternatives(name)),
        FieldSource::HiddenAlternatives(name) => texts(learnable.hidden_alternatives(name)),
        FieldSource::TypingCorrects(name) => texts(learnable.typing_corrects(name)),
        FieldSource::Attribute(name) => texts(learnable.attributes(name)),
        FieldSource::Images(name) => media(learnable.local_image_urls(name), prepare_image),
        FieldSource::Audio(name) => media(learnable.local_audio_urls(name), prepare_audio),
        FieldSource::Video(name) => media(learnable.local_video_urls(name), prepare_audio),
        FieldSource::Level => vec![learnable.level_index.to_string()],
        FieldSource::Learnable => vec![learnable.id.to_string()],
    }
}

pub fn render_field(learnable: &Learnable, source: &FieldSource) -> String {
    field_values(learnable, source).join(VALUE_SEPARATOR)
}
