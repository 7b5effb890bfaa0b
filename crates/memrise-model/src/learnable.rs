use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::course::{Direction, FieldType};
use crate::names::{AttributeName, ColumnName};

/// One vocabulary item of a course.
///
/// `identifiers` starts as `{id}` and grows when the merge pass finds the
/// same content under other ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learnable {
    pub id: u64,
    pub identifiers: BTreeSet<u64>,
    pub course_id: u64,
    /// Index of the level that first introduced this learnable.
    pub level_index: u32,
    pub direction: Option<Direction>,
    pub progress: Progress,
    column_data: BTreeMap<ColumnName, ColumnData>,
    attribute_data: BTreeMap<AttributeName, AttributeData>,
}

/// Data held by a learnable for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnData {
    Text(TextColumnData),
    Media(MediaColumnData),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextColumnData {
    pub values: Vec<String>,
    pub alternatives: Vec<String>,
    /// Accepted answers that are never displayed. Stored without the
    /// leading underscore the service uses to mark them.
    pub hidden_alternatives: Vec<String>,
    pub typing_corrects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaColumnData {
    pub field_type: FieldType,
    pub files: Vec<DownloadableFile>,
}

/// A remote media asset and, once fetched, its local file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadableFile {
    pub remote_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeData {
    pub values: Vec<String>,
}

/// Spaced-repetition state of one learnable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub ignored: bool,
    pub last_date: Option<DateTime<Utc>>,
    pub created_date: Option<DateTime<Utc>>,
    pub next_date: Option<DateTime<Utc>>,
    /// Current interval in days. `None` for items never studied.
    pub interval: Option<f64>,
    pub growth_level: u32,
    pub attempts: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub total_streak: u32,
    pub current_streak: u32,
    /// Import order, assigned once when the learnable is first seen.
    pub position: u32,
}

impl DownloadableFile {
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            local_url: None,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        self.local_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

impl MediaColumnData {
    pub fn new(field_type: FieldType, remote_urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            field_type,
            files: remote_urls.into_iter().map(DownloadableFile::new).collect(),
        }
    }

    pub fn remote_urls(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.remote_url.as_str()).collect()
    }

    pub fn local_urls(&self) -> Vec<&str> {
        self.files.iter().filter_map(|f| f.local_url.as_deref()).collect()
    }

    pub fn all_downloaded(&self) -> bool {
        self.files.iter().all(DownloadableFile::is_downloaded)
    }

    pub fn checksum(&self) -> String {
        hex_digest(&serde_json::json!(self.remote_urls()).to_string())
    }
}

impl TextColumnData {
    /// Digest of the displayed content. Typing corrects are left out since
    /// they are what the merge pass reconciles.
    pub fn checksum(&self) -> String {
        let projection = serde_json::json!([self.values, self.alternatives, self.hidden_alternatives]);
        hex_digest(&projection.to_string())
    }
}

impl AttributeData {
    pub fn checksum(&self) -> String {
        hex_digest(&serde_json::json!(self.values).to_string())
    }
}

impl ColumnData {
    pub fn checksum(&self) -> String {
        match self {
            ColumnData::Text(text) => text.checksum(),
            ColumnData::Media(media) => media.checksum(),
        }
    }

    pub fn as_text(&self) -> Option<&TextColumnData> {
        match self {
            ColumnData::Text(text) => Some(text),
            ColumnData::Media(_) => None,
        }
    }

    pub fn as_media(&self) -> Option<&MediaColumnData> {
        match self {
            ColumnData::Media(media) => Some(media),
            ColumnData::Text(_) => None,
        }
    }
}

fn hex_digest(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

impl Learnable {
    pub fn new(id: u64, course_id: u64) -> Self {
        Self {
            id,
            identifiers: BTreeSet::from([id]),
            course_id,
            level_index: 0,
            direction: None,
            progress: Progress::default(),
            column_data: BTreeMap::new(),
            attribute_data: BTreeMap::new(),
        }
    }

    /// Content digest over all column and attribute data.
    ///
    /// Keys are sorted, so two learnables with the same fields and values
    /// produce the same digest regardless of insertion order.
    pub fn checksum(&self) -> String {
        let columns: BTreeMap<&str, String> = self
            .column_data
            .iter()
            .map(|(name, data)| (name.as_str(), data.checksum()))
            .collect();
        let attributes: BTreeMap<&str, String> = self
            .attribute_data
            .iter()
            .map(|(name, data)| (name.as_str(), data.checksum()))
            .collect();

        let mut hasher = blake3::Hasher::new();
        hasher.update(serde_json::json!(columns).to_string().as_bytes());
        hasher.update(serde_json::json!(attributes).to_string().as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    // Column data

    pub fn has_column_data(&self) -> bool {
        !self.column_data.is_empty()
    }

    pub fn set_column_data(&mut self, name: ColumnName, data: ColumnData) {
        self.column_data.insert(name, data);
    }

    pub fn column_data(&self, name: &ColumnName) -> Option<&ColumnData> {
        self.column_data.get(name)
    }

    pub fn column_data_mut(&mut self, name: &ColumnName) -> Option<&mut ColumnData> {
        self.column_data.get_mut(name)
    }

    pub fn all_column_data(&self) -> impl Iterator<Item = (&ColumnName, &ColumnData)> {
        self.column_data.iter()
    }

    pub fn text_data(&self, name: &ColumnName) -> Option<&TextColumnData> {
        self.column_data.get(name).and_then(ColumnData::as_text)
    }

    pub fn text_data_mut(&mut self, name: &ColumnName) -> Option<&mut TextColumnData> {
        match self.column_data.get_mut(name) {
            Some(ColumnData::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn media_data(&self, name: &ColumnName) -> Option<&MediaColumnData> {
        self.column_data.get(name).and_then(ColumnData::as_media)
    }

    /// Every media file of every column, for downloading.
    pub fn media_files_mut(&mut self) -> impl Iterator<Item = &mut DownloadableFile> {
        self.column_data
            .values_mut()
            .filter_map(|data| match data {
                ColumnData::Media(media) => Some(media),
                ColumnData::Text(_) => None,
            })
            .flat_map(|media| media.files.iter_mut())
    }

    pub fn definitions(&self, name: &ColumnName) -> &[String] {
        self.text_data(name).map(|t| t.values.as_slice()).unwrap_or_default()
    }

    pub fn alternatives(&self, name: &ColumnName) -> &[String] {
        self.text_data(name).map(|t| t.alternatives.as_slice()).unwrap_or_default()
    }

    pub fn hidden_alternatives(&self, name: &ColumnName) -> &[String] {
        self.text_data(name)
            .map(|t| t.hidden_alternatives.as_slice())
            .unwrap_or_default()
    }

    pub fn typing_corrects(&self, name: &ColumnName) -> &[String] {
        self.text_data(name)
            .map(|t| t.typing_corrects.as_slice())
            .unwrap_or_default()
    }

    fn local_urls_of(&self, name: &ColumnName, field_type: FieldType) -> Vec<&str> {
        self.media_data(name)
            .filter(|m| m.field_type == field_type)
            .map(MediaColumnData::local_urls)
            .unwrap_or_default()
    }

    pub fn local_audio_urls(&self, name: &ColumnName) -> Vec<&str> {
        self.local_urls_of(name, FieldType::Audio)
    }

    pub fn local_image_urls(&self, name: &ColumnName) -> Vec<&str> {
        self.local_urls_of(name, FieldType::Image)
    }

    pub fn local_video_urls(&self, name: &ColumnName) -> Vec<&str> {
        self.local_urls_of(name, FieldType::Video)
    }

    // Attribute data

    pub fn set_attribute_data(&mut self, name: AttributeName, data: AttributeData) {
        self.attribute_data.insert(name, data);
    }

    pub fn attribute_data(&self, name: &AttributeName) -> Option<&AttributeData> {
        self.attribute_data.get(name)
    }

    pub fn attributes(&self, name: &AttributeName) -> &[String] {
        self.attribute_data
            .get(name)
            .map(|a| a.values.as_slice())
            .unwrap_or_default()
    }
}
