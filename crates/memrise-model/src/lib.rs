pub mod names;
pub mod course;
pub mod learnable;
pub mod merge;

pub use names::*;
pub use course::*;
pub use learnable::*;
