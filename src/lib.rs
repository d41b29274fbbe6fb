//! beadgrid: raster editing engine for bead-pattern (pixel-art) projects.
//!
//! One [`project::Project`] owns a single RGB canvas and routes pointer events
//! through the active tool into it, with bounded undo/redo, symmetry mirroring,
//! `.dpct` project files and raster export. A UI shell only has to forward
//! pointer/keyboard events and blit [`project::Project::render`].

pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod render;
pub mod settings;
pub mod view;

pub use canvas::{Color, PixelBuffer, PixelPos};
pub use error::{CanvasError, LoadWarning, ProjectError};
pub use project::{NewProjectRequest, PointerOutcome, Project};
