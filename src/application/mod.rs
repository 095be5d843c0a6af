//! Use-case layer: the session runner, its live run feeds and the page it renders.

pub mod page;
pub mod runs;
pub mod session;

pub use page::{PageChrome, PageView};
pub use runs::{RunSnapshot, RunStatus};
pub use session::{SessionRunner, Submission};
