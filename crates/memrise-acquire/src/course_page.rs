use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AcquireError, Result};
use crate::types::CourseData;

/// `learned / total` in the progress box.
fn progress_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([0-9]+)\s*/\s*([0-9]+)").expect("valid regex"))
}

/// Scrape title, description and counts from a course landing page.
///
/// The level count is the highest `div.level-index` inside a `div.levels`
/// listing. A course without levels but with a `div.things` listing is a
/// single implicit level. Anything else is fatal for the load.
pub fn parse_course_page(html: &str, url: &str) -> Result<CourseData> {
    let document = Html::parse_document(html);

    let title_sel = Selector::parse("h1.course-name").expect("valid selector");
    let description_sel = Selector::parse("span.course-description").expect("valid selector");
    let progress_sel = Selector::parse("div.progress-box-title").expect("valid selector");
    let levels_sel = Selector::parse("div.levels").expect("valid selector");
    let level_index_sel = Selector::parse("div.level-index").expect("valid selector");
    let things_sel = Selector::parse("div.things").expect("valid selector");

    let text_of = |selector: &Selector| -> String {
        document
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    };

    let mut data = CourseData {
        title: text_of(&title_sel),
        description: text_of(&description_sel),
        ..CourseData::default()
    };

    if let Some(caps) = progress_pattern().captures(&text_of(&progress_sel)) {
        data.num_learnables = caps[2].parse().unwrap_or(0);
    }

    let level_count = if document.select(&levels_sel).next().is_some() {
        document
            .select(&level_index_sel)
            .filter_map(|el| el.text().collect::<String>().trim().parse::<u32>().ok())
            .max()
            .unwrap_or(0)
    } else if document.select(&things_sel).next().is_some() {
        1
    } else {
        0
    };

    if level_count == 0 {
        return Err(AcquireError::MissingLevelCount { url: url.to_string() });
    }
    data.num_levels = level_count;

    tracing::debug!(
        title = %data.title,
        levels = data.num_levels,
        learnables = data.num_learnables,
        "Parsed course page"
    );

    Ok(data)
}

/// Pull the OAuth client id out of the sign-in page's `__NEXT_DATA__` blob.
pub fn parse_oauth_client_id(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script_sel = Selector::parse("#__NEXT_DATA__").expect("valid selector");
    let raw = document.select(&script_sel).next()?.text().collect::<String>();
    let info: serde_json::Value = serde_json::from_str(&raw).ok()?;
    info.pointer("/runtimeConfig/OAUTH_CLIENT_ID")
        .and_then(|id| match id {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
