use memrise_model::Level;

pub const DEFAULT_MIN_LEVEL_TAG_WIDTH: usize = 2;

/// Title-case like a word processor: the first letter after a non-letter is
/// upper case, the rest lower case.
fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}

/// CamelCase tag from a level title. `None` when nothing but digits remain.
pub fn title_tag(title: &str) -> Option<String> {
    let tag: String = title_case(title).chars().filter(|c| c.is_alphanumeric()).collect();
    if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(tag)
    }
}

/// `Level01`-style tag.
pub fn level_tag(index: u32, width: usize) -> String {
    format!("Level{index:0width$}")
}

/// Tags for every note of `level`: the level number, padded so tags sort
/// in order across the course, and the title tag when there is one.
pub fn level_tags(level_count: usize, level: &Level, min_width: usize) -> Vec<String> {
    let width = min_width.max(level_count.to_string().len());
    let mut tags = vec![level_tag(level.index, width)];
    tags.extend(title_tag(&level.title));
    tags
}
