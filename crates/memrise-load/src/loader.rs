use std::future::Future;

use memrise_acquire::{course_id_from_url, CourseSource, LevelPayload};
use memrise_model::merge::merge_similar_learnables;
use memrise_model::{Course, Learnable, Level};
use tokio_util::sync::CancellationToken;

use crate::error::LoadError;
use crate::normalize::{apply_progress, apply_screens};

pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// What to do when a single media file cannot be downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorPolicy {
    /// Log it and keep the learnable without that file.
    Ignore,
    /// Fail the whole load.
    Abort,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub download_media: bool,
    /// Reuse media files already present in the download directory.
    pub skip_existing_media: bool,
    pub media_errors: MediaErrorPolicy,
    /// Capacity of the progress event channel of a spawned load.
    pub event_buffer: usize,
}

impl LoadOptions {
    pub fn new(media_errors: MediaErrorPolicy) -> Self {
        Self {
            download_media: true,
            skip_existing_media: true,
            media_errors,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Where a load currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Init,
    LoadingCourseMeta,
    LoadingLevel(u32),
    Merging,
    Done,
    Failed,
}

/// Progress callbacks of a course load. Every method defaults to doing
/// nothing, so observers implement only what they need.
pub trait LoadObserver {
    /// Declared number of levels, before any level is fetched.
    fn level_count_changed(&mut self, _count: u32) {}

    /// Declared number of learnables, before any level is fetched.
    fn thing_count_changed(&mut self, _count: u32) {}

    /// Fired once per level index, with `None` for a level that was not found.
    fn level_loaded(&mut self, _index: u32, _level: Option<&Level>) {}

    /// Fired for every learnable of every level payload, including ones
    /// already seen in an earlier level.
    fn thing_loaded(&mut self, _learnable: &Learnable) {}
}

/// Builds a [`Course`] from a [`CourseSource`], one level at a time.
///
/// A level that is not found is skipped. Any other error fails the load and
/// no course is returned.
pub struct CourseLoader<S> {
    source: S,
    options: LoadOptions,
    observers: Vec<Box<dyn LoadObserver + Send>>,
    cancel: CancellationToken,
    state: LoadState,
    level_count: u32,
    learnable_count: u32,
}

impl<S: CourseSource> CourseLoader<S> {
    pub fn new(source: S, options: LoadOptions) -> Self {
        Self {
            source,
            options,
            observers: Vec::new(),
            cancel: CancellationToken::new(),
            state: LoadState::Init,
            level_count: 0,
            learnable_count: 0,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn register_observer(&mut self, observer: Box<dyn LoadObserver + Send>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Level count declared by the course page.
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    /// Learnable count declared by the course page.
    pub fn learnable_count(&self) -> u32 {
        self.learnable_count
    }

    /// Validate a course page URL, then load that course.
    pub async fn load_course_url(&mut self, url: &str) -> Result<Course, LoadError> {
        let course_id = match course_id_from_url(url) {
            Ok(id) => id,
            Err(e) => {
                self.state = LoadState::Failed;
                tracing::error!(url = %url, error = %e, "Invalid course URL");
                return Err(e.into());
            }
        };
        self.load_course(course_id).await
    }

    pub async fn load_course(&mut self, course_id: u64) -> Result<Course, LoadError> {
        let result = self.run(course_id).await;
        match &result {
            Ok(course) => {
                self.state = LoadState::Done;
                tracing::info!(
                    course_id,
                    title = %course.title,
                    levels = course.level_count(),
                    learnables = course.learnable_count(),
                    "Course loaded"
                );
            }
            Err(e) => {
                self.state = LoadState::Failed;
                tracing::error!(course_id, error = %e, "Course load failed");
            }
        }
        result
    }

    async fn run(&mut self, course_id: u64) -> Result<Course, LoadError> {
        self.state = LoadState::LoadingCourseMeta;
        let data = cancellable(&self.cancel, self.source.load_course_data(course_id)).await??;

        let mut course = Course::new(course_id);
        course.set_title(&data.title);
        course.description = data.description.trim().to_string();
        self.level_count = data.num_levels;
        self.learnable_count = data.num_learnables;
        tracing::info!(
            course_id,
            title = %course.title,
            levels = data.num_levels,
            learnables = data.num_learnables,
            "Fetched course metadata"
        );

        let (levels, things) = (self.level_count, self.learnable_count);
        self.notify(|o| o.level_count_changed(levels));
        self.notify(|o| o.thing_count_changed(things));

        for index in 1..=self.level_count {
            if self.cancel.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            self.state = LoadState::LoadingLevel(index);

            match self.load_level(&mut course, index).await {
                Ok(level) => {
                    self.notify(|o| o.level_loaded(index, Some(&level)));
                    course.push_level(level);
                }
                Err(e) if e.is_level_not_found() => {
                    tracing::warn!(level = index, "Level not found, skipping");
                    self.notify(|o| o.level_loaded(index, None));
                }
                Err(e) => return Err(e),
            }
        }

        self.state = LoadState::Merging;
        let stats = merge_similar_learnables(&mut course);
        tracing::info!(
            groups = stats.duplicate_groups,
            merged = stats.merged_learnables,
            "Merged similar learnables"
        );

        Ok(course)
    }

    async fn load_level(&mut self, course: &mut Course, index: u32) -> Result<Level, LoadError> {
        let payload: LevelPayload =
            cancellable(&self.cancel, self.source.load_level_data(course.id, index))
                .await?
                .map_err(|source| LoadError::Level { level: index, source })?;

        let info = &payload.session_source_info;
        let mut level = Level::new(
            info.level_id,
            info.source_sub_index,
            info.level_name.as_deref().unwrap_or_default(),
            course.id,
        );

        let source = &self.source;
        let resolve = |url: &str| source.to_absolute_media_url(url);

        for item in &payload.learnables {
            if course.has_learnable(item.id) || level.has_learnable(item.id) {
                tracing::debug!(learnable = item.id, level = index, "Learnable seen before");
                continue;
            }

            let mut learnable = Learnable::new(item.id, course.id);
            learnable.progress.position = course.next_position();
            apply_screens(course, &mut learnable, item, &resolve);

            if self.options.download_media {
                download_media(&self.source, &self.options, &self.cancel, &mut learnable).await?;
            }
            level.add_learnable(learnable);
        }

        for entry in &payload.progress {
            let id = entry.learnable_id;
            match level.learnable_mut(id).or_else(|| course.learnable_mut(id)) {
                Some(learnable) => apply_progress(&mut learnable.progress, entry),
                None => tracing::debug!(learnable = id, "Progress for unknown learnable"),
            }
        }

        for item in &payload.learnables {
            if let Some(learnable) = level.learnable(item.id).or_else(|| course.learnable(item.id)) {
                for observer in &mut self.observers {
                    observer.thing_loaded(learnable);
                }
            }
        }

        tracing::info!(
            level = index,
            title = %level.title,
            learnables = level.len(),
            "Loaded level"
        );
        Ok(level)
    }

    fn notify(&mut self, mut signal: impl FnMut(&mut dyn LoadObserver)) {
        for observer in &mut self.observers {
            signal(observer.as_mut());
        }
    }
}

/// Await `future` unless the load is cancelled first.
async fn cancellable<T>(cancel: &CancellationToken, future: impl Future<Output = T>) -> Result<T, LoadError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LoadError::Cancelled),
        value = future => Ok(value),
    }
}

/// Fetch every media file of `learnable` that has no local copy yet.
async fn download_media<S: CourseSource>(
    source: &S,
    options: &LoadOptions,
    cancel: &CancellationToken,
    learnable: &mut Learnable,
) -> Result<(), LoadError> {
    let id = learnable.id;
    for file in learnable.media_files_mut() {
        if file.is_downloaded() {
            continue;
        }
        let result = cancellable(
            cancel,
            source.download_media(&file.remote_url, options.skip_existing_media),
        )
        .await?;

        match result {
            Ok(local) => file.local_url = Some(local),
            Err(e) => match options.media_errors {
                MediaErrorPolicy::Ignore => {
                    tracing::warn!(
                        learnable = id,
                        url = %file.remote_url,
                        error = %e,
                        "Media download failed, continuing without it"
                    );
                }
                MediaErrorPolicy::Abort => {
                    return Err(LoadError::Media {
                        url: file.remote_url.clone(),
                        source: e,
                    });
                }
            },
        }
    }
    Ok(())
}
