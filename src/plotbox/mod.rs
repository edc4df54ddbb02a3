//! Declarative plotting of signals and Volterra kernels.
//!
//! Plotting routines build a scene made of [`Figure`]s holding [`Panel`]s.
//! Nothing is drawn until the scene is saved through
//! [`savebox`](crate::savebox), which renders it with the plotters crate.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use signal_toolbox::NdArray;
//! use signal_toolbox::plotbox::{SigIoOptions, sig_io};
//! use signal_toolbox::savebox::{RenderOptions, save_figure};
//! use ndarray::Array1;
//!
//! # fn example() -> signal_toolbox::ToolboxResult<()> {
//! let time: Vec<f64> = (0..100).map(|n| n as f64 / 100.0).collect();
//! let input = NdArray::from(Array1::from_iter(time.iter().map(|t| (6.0 * t).sin())));
//! let output = NdArray::from(Array1::from_iter(time.iter().map(|t| 0.5 * (6.0 * t).sin())));
//!
//! let fig = sig_io(&time, &input, &output, &SigIoOptions::default())?;
//! save_figure(&fig, "io", "figures", &RenderOptions::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **core**: axis scales, limits, palettes and themes
//! - **elements**: line series, gridded values and panels
//! - **composer**: figures, animations and their rendering
//! - **kernels**: rank dispatch of Volterra kernels
//! - **plotting**: the plotting routines

pub mod composer;
pub mod core;
pub mod elements;
pub mod kernels;
pub mod plotting;

pub use composer::*;
pub use core::*;
pub use elements::*;
pub use kernels::*;
pub use plotting::*;
