//! Domain logic - pure version rules independent of any VCS

pub mod check;
pub mod format;
pub mod pattern;
pub mod stage;
pub mod style;
pub mod version;

pub use check::check;
pub use format::render;
pub use pattern::{ParsedTag, Pattern};
pub use stage::Stage;
pub use style::{SerializeOptions, Style};
pub use version::{VcsFacts, Version};
