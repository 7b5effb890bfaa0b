// Wire format of the Memrise course page and level endpoint.
//
// Everything service-specific lives here. Fields are optional or defaulted
// wherever the service has been seen to omit them, and unknown screen
// templates or field kinds deserialize to catch-all variants instead of
// failing the whole level.

use std::collections::BTreeMap;

use memrise_model::Side;
use serde::{Deserialize, Deserializer, Serialize};

/// Metadata scraped from the course landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseData {
    pub title: String,
    pub description: String,
    pub num_levels: u32,
    pub num_learnables: u32,
}

/// One level as returned by the learning-session endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelPayload {
    pub session_source_info: SessionSourceInfo,
    #[serde(default)]
    pub learnables: Vec<LearnablePayload>,
    #[serde(default)]
    pub progress: Vec<ProgressEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSourceInfo {
    #[serde(deserialize_with = "flexible_id")]
    pub level_id: u64,
    pub source_sub_index: u32,
    #[serde(default)]
    pub level_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LearnablePayload {
    #[serde(deserialize_with = "flexible_id")]
    pub id: u64,
    /// Keyed by template id; iterated in key order.
    #[serde(default)]
    pub screens: BTreeMap<String, Screen>,
}

/// One presentation template of a learnable.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Screen {
    Presentation(PresentationScreen),
    Typing(TypingScreen),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationScreen {
    pub item: Option<ScreenField>,
    pub definition: Option<ScreenField>,
    #[serde(default)]
    pub audio: Option<ScreenField>,
    #[serde(default)]
    pub video: Option<ScreenField>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub visible_info: Vec<ScreenField>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub hidden_info: Vec<ScreenField>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub attributes: Vec<Option<AttributeField>>,
}

impl PresentationScreen {
    /// All field-bearing records in display order.
    pub fn fields(&self) -> impl Iterator<Item = &ScreenField> {
        [&self.item, &self.definition, &self.audio, &self.video]
            .into_iter()
            .flatten()
            .chain(self.visible_info.iter())
            .chain(self.hidden_info.iter())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingScreen {
    pub answer: AnswerField,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub correct: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerField {
    pub label: String,
}

/// A field record, tagged by the kind of content it carries.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScreenField {
    Text(TextField),
    Audio(MediaField),
    Image(MediaField),
    Video(MediaField),
    #[serde(other)]
    Unsupported,
}

impl ScreenField {
    pub fn label(&self) -> Option<&str> {
        match self {
            ScreenField::Text(f) => Some(&f.label),
            ScreenField::Audio(f) | ScreenField::Image(f) | ScreenField::Video(f) => Some(&f.label),
            ScreenField::Unsupported => None,
        }
    }

    pub fn direction(&self) -> Option<Side> {
        match self {
            ScreenField::Text(f) => Some(f.direction),
            ScreenField::Audio(f) | ScreenField::Image(f) | ScreenField::Video(f) => Some(f.direction),
            ScreenField::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextField {
    pub label: String,
    #[serde(default = "default_side")]
    pub direction: Side,
    #[serde(default, deserialize_with = "nullable_string")]
    pub value: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaField {
    pub label: String,
    #[serde(default = "default_side")]
    pub direction: Side,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub value: Vec<MediaRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaRef {
    #[serde(default, deserialize_with = "nullable_string")]
    pub normal: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeField {
    pub label: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub value: String,
}

/// Learner progress for one learnable. Dates stay raw ISO-8601 strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressEntry {
    #[serde(deserialize_with = "flexible_id")]
    pub learnable_id: u64,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub last_date: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub next_date: Option<String>,
    #[serde(default)]
    pub interval: Option<f64>,
    #[serde(default)]
    pub growth_level: Option<u32>,
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub correct: Option<u32>,
    #[serde(default)]
    pub total_streak: Option<u32>,
    #[serde(default)]
    pub current_streak: Option<u32>,
}

fn default_side() -> Side {
    Side::Source
}

/// Ids arrive as numbers in some payloads and as strings in others.
fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
