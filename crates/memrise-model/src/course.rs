use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::learnable::Learnable;
use crate::names::{sanitize_name, AttributeName, ColumnName, DEFAULT_COURSE_TITLE};

/// A course as loaded from Memrise.
///
/// Owns its levels, which own their learnables. The column and attribute
/// registries are shared by every learnable of the course and keep the
/// order in which fields were first seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub title: String,
    pub description: String,
    next_position: u32,
    levels: Vec<Level>,
    columns: Vec<Column>,
    attributes: Vec<Attribute>,
}

/// Kind of content a field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Audio,
    Image,
    Video,
}

impl FieldType {
    pub const ALL: [FieldType; 4] = [FieldType::Text, FieldType::Audio, FieldType::Image, FieldType::Video];

    pub fn is_media(self) -> bool {
        !matches!(self, FieldType::Text)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Text => "text",
            FieldType::Audio => "audio",
            FieldType::Image => "image",
            FieldType::Video => "video",
        };
        f.write_str(s)
    }
}

/// Which side of the translation pair a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

/// A typed field shared by all learnables of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: ColumnName,
    pub field_type: FieldType,
    pub side: Side,
}

/// Auxiliary text metadata, e.g. part of speech. Always text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: AttributeName,
}

/// One study direction: the column shown on the front and the one on the back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Direction {
    pub front: ColumnName,
    pub back: ColumnName,
}

impl Direction {
    pub fn new(front: ColumnName, back: ColumnName) -> Self {
        Self { front, back }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.front, self.back)
    }
}

/// One lesson of a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub id: u64,
    /// 1-based position within the course.
    pub index: u32,
    pub title: String,
    pub course_id: u64,
    learnables: Vec<Learnable>,
}

impl Level {
    pub fn new(id: u64, index: u32, title: &str, course_id: u64) -> Self {
        Self {
            id,
            index,
            title: sanitize_name(title, ""),
            course_id,
            learnables: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.learnables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learnables.is_empty()
    }

    /// Learnables in the order they were added.
    pub fn learnables(&self) -> &[Learnable] {
        &self.learnables
    }

    pub fn learnables_mut(&mut self) -> impl Iterator<Item = &mut Learnable> {
        self.learnables.iter_mut()
    }

    pub fn has_learnable(&self, id: u64) -> bool {
        self.learnables.iter().any(|l| l.id == id)
    }

    pub fn learnable(&self, id: u64) -> Option<&Learnable> {
        self.learnables.iter().find(|l| l.id == id)
    }

    pub fn learnable_mut(&mut self, id: u64) -> Option<&mut Learnable> {
        self.learnables.iter_mut().find(|l| l.id == id)
    }

    /// Add a learnable, replacing any previous one with the same id.
    pub fn add_learnable(&mut self, mut learnable: Learnable) {
        learnable.level_index = self.index;
        match self.learnables.iter_mut().find(|l| l.id == learnable.id) {
            Some(existing) => *existing = learnable,
            None => self.learnables.push(learnable),
        }
    }

    /// Distinct directions used by this level's learnables.
    pub fn directions(&self) -> BTreeSet<Direction> {
        self.learnables
            .iter()
            .filter_map(|l| l.direction.clone())
            .collect()
    }
}

impl Course {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            next_position: 1,
            levels: Vec::new(),
            columns: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = sanitize_name(title, DEFAULT_COURSE_TITLE);
    }

    /// Hand out the next import position. Positions start at 1 and never repeat.
    pub fn next_position(&mut self) -> u32 {
        let position = self.next_position;
        self.next_position += 1;
        position
    }

    // Levels

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> impl Iterator<Item = &mut Level> {
        self.levels.iter_mut()
    }

    pub fn push_level(&mut self, level: Level) {
        self.levels.push(level);
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Level at a position in the loaded list (0-based).
    pub fn level_by_position(&self, position: usize) -> Option<&Level> {
        self.levels.get(position)
    }

    /// Level with the given 1-based course index. Gaps are possible.
    pub fn level_by_index(&self, index: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.index == index)
    }

    // Learnables

    pub fn learnables(&self) -> impl Iterator<Item = &Learnable> {
        self.levels.iter().flat_map(|l| l.learnables.iter())
    }

    pub fn learnables_mut(&mut self) -> impl Iterator<Item = &mut Learnable> {
        self.levels.iter_mut().flat_map(|l| l.learnables.iter_mut())
    }

    pub fn learnable_count(&self) -> usize {
        self.levels.iter().map(Level::len).sum()
    }

    pub fn has_learnable(&self, id: u64) -> bool {
        self.levels.iter().any(|l| l.has_learnable(id))
    }

    pub fn learnable(&self, id: u64) -> Option<&Learnable> {
        self.levels.iter().find_map(|l| l.learnable(id))
    }

    pub fn learnable_mut(&mut self, id: u64) -> Option<&mut Learnable> {
        self.levels.iter_mut().find_map(|l| l.learnable_mut(id))
    }

    /// Distinct directions across all levels.
    pub fn directions(&self) -> Vec<Direction> {
        let all: BTreeSet<Direction> = self.levels.iter().flat_map(Level::directions).collect();
        all.into_iter().collect()
    }

    // Columns

    /// Register a column unless one with the same name exists.
    ///
    /// The first registration wins: type and side of an existing column are
    /// never changed. Returns the registered column either way.
    pub fn add_column(&mut self, field_type: FieldType, name: ColumnName, side: Side) -> &Column {
        let position = match self.columns.iter().position(|c| c.name == name) {
            Some(position) => position,
            None => {
                tracing::debug!(column = %name, kind = %field_type, "Registered column");
                self.columns.push(Column { name, field_type, side });
                self.columns.len() - 1
            }
        };
        &self.columns[position]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_by_type(&self, field_type: FieldType) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.field_type == field_type)
    }

    pub fn column_by_name(&self, name: &ColumnName) -> Option<&Column> {
        self.columns.iter().find(|c| &c.name == name)
    }

    pub fn column_by_position(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    pub fn column_names(&self) -> Vec<&ColumnName> {
        self.columns.iter().map(|c| &c.name).collect()
    }

    pub fn column_names_by_type(&self, field_type: FieldType) -> Vec<&ColumnName> {
        self.columns_by_type(field_type).map(|c| &c.name).collect()
    }

    pub fn has_column(&self, name: &ColumnName) -> bool {
        self.column_by_name(name).is_some()
    }

    pub fn has_column_with_type(&self, name: &ColumnName, field_type: FieldType) -> bool {
        self.column_by_name(name).is_some_and(|c| c.field_type == field_type)
    }

    pub fn count_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn count_columns_with_type(&self, field_type: FieldType) -> usize {
        self.columns_by_type(field_type).count()
    }

    // Attributes

    /// Register an attribute unless one with the same name exists.
    pub fn add_attribute(&mut self, name: AttributeName) -> &Attribute {
        let position = match self.attributes.iter().position(|a| a.name == name) {
            Some(position) => position,
            None => {
                tracing::debug!(attribute = %name, "Registered attribute");
                self.attributes.push(Attribute { name });
                self.attributes.len() - 1
            }
        };
        &self.attributes[position]
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_by_name(&self, name: &AttributeName) -> Option<&Attribute> {
        self.attributes.iter().find(|a| &a.name == name)
    }

    pub fn attribute_by_position(&self, position: usize) -> Option<&Attribute> {
        self.attributes.get(position)
    }

    pub fn attribute_names(&self) -> Vec<&AttributeName> {
        self.attributes.iter().map(|a| &a.name).collect()
    }

    pub fn has_attribute(&self, name: &AttributeName) -> bool {
        self.attribute_by_name(name).is_some()
    }

    pub fn count_attributes(&self) -> usize {
        self.attributes.len()
    }
}
