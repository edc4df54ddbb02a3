//! Persistence of data, figures and animations.
//!
//! All routines take a [`PathSpec`] describing the destination folder, which
//! is created on demand, and return the full path they wrote to.

pub mod figures;
pub mod paths;
pub mod record;
pub mod serialization;

pub use figures::{
    DEFAULT_ANIMATION_EXTENSION, DEFAULT_FIGURE_EXTENSION, Exportable, RenderOptions,
    save_animation, save_figure,
};
pub use paths::{PathSpec, resolve};
pub use record::{Data, Record, Value};
pub use serialization::{DEFAULT_ARRAY_KEY, SaveMode, load, save};
