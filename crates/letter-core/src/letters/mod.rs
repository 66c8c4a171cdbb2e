//! Letter rendering and staging

pub mod renderer;
pub mod templates;
pub mod writer;

pub use renderer::{LetterRenderer, RenderedDocument};
pub use writer::{DocumentWriter, StagedFile};
