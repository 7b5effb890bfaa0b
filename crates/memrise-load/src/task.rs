// Background course loads.
//
// The whole load runs sequentially on one tokio task. Progress goes out on a
// bounded channel with non-blocking sends: when the receiver falls behind,
// events are dropped rather than slowing the load. The final result is only
// available through `LoadHandle::wait`.

use memrise_acquire::CourseSource;
use memrise_model::{Course, Learnable, Level};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::LoadError;
use crate::loader::{CourseLoader, LoadObserver, LoadOptions};

/// Progress of a spawned load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    LevelCount(u32),
    ThingCount(u32),
    LevelLoaded { index: u32, found: bool },
    ThingLoaded { id: u64 },
}

/// Forwards observer callbacks to a channel as [`LoadEvent`]s.
pub struct ChannelObserver {
    events: mpsc::Sender<LoadEvent>,
}

impl ChannelObserver {
    pub fn new(events: mpsc::Sender<LoadEvent>) -> Self {
        Self { events }
    }

    fn send(&self, event: LoadEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.events.try_send(event) {
            tracing::trace!(?event, "Progress channel full, event dropped");
        }
    }
}

impl LoadObserver for ChannelObserver {
    fn level_count_changed(&mut self, count: u32) {
        self.send(LoadEvent::LevelCount(count));
    }

    fn thing_count_changed(&mut self, count: u32) {
        self.send(LoadEvent::ThingCount(count));
    }

    fn level_loaded(&mut self, index: u32, level: Option<&Level>) {
        self.send(LoadEvent::LevelLoaded {
            index,
            found: level.is_some(),
        });
    }

    fn thing_loaded(&mut self, learnable: &Learnable) {
        self.send(LoadEvent::ThingLoaded { id: learnable.id });
    }
}

/// A running load.
///
/// `events` closes once the load has finished; `wait` then yields the course
/// or the error that ended the load.
pub struct LoadHandle {
    pub events: mpsc::Receiver<LoadEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<Course, LoadError>>,
}

impl LoadHandle {
    /// Ask the load to stop. It ends with [`LoadError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// A panic in the load task is resumed here.
    pub async fn wait(self) -> Result<Course, LoadError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(LoadError::Worker(e.to_string())),
        }
    }
}

/// Start loading `course_id` on a background task.
pub fn spawn_load<S>(source: S, course_id: u64, options: LoadOptions) -> LoadHandle
where
    S: CourseSource + 'static,
{
    let (sender, events) = mpsc::channel(options.event_buffer.max(1));
    let cancel = CancellationToken::new();

    let mut loader = CourseLoader::new(source, options).with_cancellation(cancel.clone());
    loader.register_observer(Box::new(ChannelObserver::new(sender)));

    let task = tokio::spawn(async move { loader.load_course(course_id).await });

    LoadHandle {
        events,
        cancel,
        task,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::loader::MediaErrorPolicy;
    use crate::testing::{sample_learnable, sample_level, FakeSource};

    fn sample_source() -> FakeSource {
        FakeSource::new(2, 2)
            .with_level(1, sample_level(1, 1, vec![sample_learnable(10, "uno", "one")], vec![]))
            .with_level(2, sample_level(2, 2, vec![sample_learnable(20, "dos", "two")], vec![]))
    }

    #[tokio::test]
    async fn test_spawned_load_reports_progress_and_result() {
        let mut handle = spawn_load(sample_source(), 7, LoadOptions::new(MediaErrorPolicy::Ignore));

        let mut events = Vec::new();
        while let Some(event) = handle.events.recv().await {
            events.push(event);
        }
        let course = handle.wait().await.unwrap();

        assert_eq!(course.level_count(), 2);
        assert_eq!(
            events,
            vec![
                LoadEvent::LevelCount(2),
                LoadEvent::ThingCount(2),
                LoadEvent::ThingLoaded { id: 10 },
                LoadEvent::LevelLoaded { index: 1, found: true },
                LoadEvent::ThingLoaded { id: 20 },
                LoadEvent::LevelLoaded { index: 2, found: true },
            ]
        );
    }

    #[tokio::test]
    async fn test_full_channel_does_not_block_load() {
        let mut options = LoadOptions::new(MediaErrorPolicy::Ignore);
        options.event_buffer = 1;
        let mut handle = spawn_load(Arc::new(sample_source()), 7, options);

        // Nobody reads until the load is done.
        let cancel = handle.cancellation_token();
        let course = {
            let task = &mut handle.task;
            task.await.unwrap().unwrap()
        };
        assert!(!cancel.is_cancelled());
        assert_eq!(course.learnable_count(), 2);
        assert_eq!(handle.events.recv().await, Some(LoadEvent::LevelCount(2)));
        assert_eq!(handle.events.recv().await, None);
    }

    #[tokio::test]
    #[should_panic(expected = "observer blew up")]
    async fn test_worker_panic_is_resumed() {
        struct Exploding;
        impl LoadObserver for Exploding {
            fn level_count_changed(&mut self, _count: u32) {
                panic!("observer blew up");
            }
        }

        let (sender, events) = mpsc::channel(1);
        let mut loader = CourseLoader::new(sample_source(), LoadOptions::new(MediaErrorPolicy::Ignore));
        loader.register_observer(Box::new(ChannelObserver::new(sender)));
        loader.register_observer(Box::new(Exploding));
        let handle = LoadHandle {
            events,
            cancel: CancellationToken::new(),
            task: tokio::spawn(async move { loader.load_course(7).await }),
        };
        let _ = handle.wait().await;
    }

    #[tokio::test]
    async fn test_cancelled_spawned_load() {
        let handle = spawn_load(sample_source(), 7, LoadOptions::new(MediaErrorPolicy::Ignore));
        // The task has not been polled yet on the test runtime.
        handle.cancel();
        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, LoadError::Cancelled));
    }
}
