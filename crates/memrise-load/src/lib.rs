pub mod error;
pub mod loader;
pub mod normalize;
pub mod task;

#[cfg(test)]
mod testing;

pub use error::LoadError;
pub use loader::{CourseLoader, LoadObserver, LoadOptions, LoadState, MediaErrorPolicy};
pub use task::{spawn_load, ChannelObserver, LoadEvent, LoadHandle};
