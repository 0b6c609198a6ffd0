//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the pre-trained artifacts and the page renderer.

mod model;
mod renderer;

pub use model::{Classifier, ModelError, Scaler};
pub use renderer::{RenderError, ReportRenderer};
