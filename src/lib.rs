// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_const_for_fn)] // Suggests making eligible functions `const`
#![allow(clippy::too_many_arguments)]
#![warn(missing_docs)]

//! # signal_toolbox
//!
//! Helpers for numerical experiments on signals and nonlinear systems:
//! persisting arrays and records, plotting signals, spectrograms and
//! Volterra kernels, and keeping a log of what a script printed.
//!
//! ## Modules
//!
//! - [`savebox`]: directory resolution, saving and loading of data in four
//!   modes (`pickle`, `npy`, `npz`, `comp-npz`), saving of figures and
//!   animations
//! - [`plotbox`]: plotting routines (`sig_io`, `time_sig`, `coll`,
//!   `spectrogram`, `time_kernel`, `freq_kernel`) building declarative
//!   figures rendered with `plotters`
//! - [`mathbox`]: decibel conversion, phase unwrapping and STFT
//! - [`utilities`]: duplication of stdout/stderr to a log file and log headers
//!
//! ## Features
//!
//! - `plotting` (default): the [`plotbox`] module and the `plotters` backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use signal_toolbox::savebox::{Record, SaveMode, load, save};
//! use ndarray::array;
//!
//! # fn example() -> signal_toolbox::ToolboxResult<()> {
//! let record = Record::new()
//!     .with("input", array![0.0, 1.0, 0.0])
//!     .with("output", array![0.0, 0.5, 0.0]);
//!
//! save(record, "experiment", vec!["results", "run1"], SaveMode::CompressedNpz)?;
//! let restored = load("experiment.npz", vec!["results", "run1"])?;
//! assert!(restored.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`ToolboxResult<T>`], an alias for
//! `Result<T, ToolboxError>`. Non-fatal conditions (an ambiguous file name
//! on load, an unusable path specification) are reported through `tracing`
//! warnings; the crate never installs a subscriber itself.

mod error;
mod repr;

pub mod mathbox;
#[cfg(feature = "plotting")]
pub mod plotbox;
pub mod savebox;
pub mod utilities;

pub use crate::error::{ToolboxError, ToolboxResult};
pub use crate::repr::NdArray;

pub use crate::savebox::{
    Data, PathSpec, Record, RenderOptions, SaveMode, Value, load, resolve, save, save_animation,
    save_figure,
};
pub use crate::utilities::{duplicate_stdout_stream_to_file, make_header};

#[cfg(feature = "plotting")]
pub use crate::plotbox::{
    Animation, Figure, KernelStyle, PlotHandle, coll, freq_kernel, sig_io, spectrogram, time_kernel,
    time_sig,
};
