// Canned course source and observer used by the loader and task tests.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use memrise_acquire::{AcquireError, CourseData, CourseSource, LevelPayload, Result};
use memrise_model::{Learnable, Level};
use serde_json::{json, Value};

use crate::loader::LoadObserver;

pub(crate) struct FakeSource {
    pub course: CourseData,
    levels: BTreeMap<u32, String>,
    broken_levels: BTreeSet<u32>,
    pub downloads: Mutex<Vec<String>>,
    pub level_requests: Mutex<Vec<u32>>,
}

impl FakeSource {
    pub fn new(num_levels: u32, num_learnables: u32) -> Self {
        Self {
            course: CourseData {
                title: "Basic <i>Spanish</i>".to_string(),
                description: " Everyday words ".to_string(),
                num_levels,
                num_learnables,
            },
            levels: BTreeMap::new(),
            broken_levels: BTreeSet::new(),
            downloads: Mutex::new(Vec::new()),
            level_requests: Mutex::new(Vec::new()),
        }
    }

    /// Serve `payload` for level `index`. Levels without a payload are not found.
    pub fn with_level(mut self, index: u32, payload: Value) -> Self {
        self.levels.insert(index, payload.to_string());
        self
    }

    /// Level `index` fails with an error other than not-found.
    pub fn with_broken_level(mut self, index: u32) -> Self {
        self.broken_levels.insert(index);
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

impl CourseSource for FakeSource {
    fn load_course_data(&self, _course_id: u64) -> impl Future<Output = Result<CourseData>> + Send {
        let data = self.course.clone();
        async move { Ok(data) }
    }

    fn load_level_data(
        &self,
        _course_id: u64,
        level_index: u32,
    ) -> impl Future<Output = Result<LevelPayload>> + Send {
        self.level_requests.lock().unwrap().push(level_index);
        let result = if self.broken_levels.contains(&level_index) {
            Err(AcquireError::Io {
                path: PathBuf::from("level"),
                source: std::io::Error::other("connection lost"),
            })
        } else {
            match self.levels.get(&level_index) {
                Some(payload) => Ok(serde_json::from_str(payload).unwrap()),
                None => Err(AcquireError::LevelNotFound { level: level_index }),
            }
        };
        async move { result }
    }

    fn to_absolute_media_url(&self, url: &str) -> String {
        format!("https://static.test/{}", url.trim_start_matches('/'))
    }

    fn download_media(
        &self,
        url: &str,
        _skip_existing: bool,
    ) -> impl Future<Output = Result<String>> + Send {
        self.downloads.lock().unwrap().push(url.to_string());
        let result = if url.contains("broken") {
            Err(AcquireError::Io {
                path: PathBuf::from(url),
                source: std::io::Error::other("download failed"),
            })
        } else {
            Ok(format!("local-{}", url.rsplit('/').next().unwrap_or_default()))
        };
        async move { result }
    }
}

/// A learnable with a Spanish/English presentation screen, an audio file
/// named after the word and a typing screen.
pub(crate) fn sample_learnable(id: u64, word: &str, meaning: &str) -> Value {
    json!({
        "id": id,
        "screens": {
            "1": {
                "template": "presentation",
                "item": {"kind": "text", "label": "Spanish", "direction": "source",
                         "value": word, "alternatives": []},
                "definition": {"kind": "text", "label": "English", "direction": "target",
                               "value": meaning, "alternatives": []},
                "audio": {"kind": "audio", "label": "Audio", "direction": "source",
                          "value": [{"normal": format!("/static/{word}.mp3")}]},
                "attributes": []
            },
            "2": {"template": "typing", "answer": {"label": "Spanish"}, "correct": [word, ""]}
        }
    })
}

pub(crate) fn sample_level(level_id: u64, index: u32, learnables: Vec<Value>, progress: Vec<Value>) -> Value {
    json!({
        "session_source_info": {
            "level_id": level_id,
            "source_sub_index": index,
            "level_name": format!("Level {index}")
        },
        "learnables": learnables,
        "progress": progress
    })
}

/// Records observer callbacks as short strings.
#[derive(Clone, Default)]
pub(crate) struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }
}

impl LoadObserver for Recorder {
    fn level_count_changed(&mut self, count: u32) {
        self.push(format!("levels:{count}"));
    }

    fn thing_count_changed(&mut self, count: u32) {
        self.push(format!("things:{count}"));
    }

    fn level_loaded(&mut self, index: u32, level: Option<&Level>) {
        match level {
            Some(level) => self.push(format!("level:{index}:{}", level.len())),
            None => self.push(format!("level:{index}:missing")),
        }
    }

    fn thing_loaded(&mut self, learnable: &Learnable) {
        self.push(format!("thing:{}", learnable.id));
    }
}
