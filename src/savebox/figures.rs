//! Saving of figure and animation handles.
//!
//! The routines here only decide where a handle goes; the handle itself
//! knows how to render through the [`Exportable`] trait.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::paths::PathSpec;
use crate::ToolboxResult;

/// Extension appended to figure names that carry none.
pub const DEFAULT_FIGURE_EXTENSION: &str = ".png";

/// Extension appended to animation names that carry none.
pub const DEFAULT_ANIMATION_EXTENSION: &str = ".gif";

/// Rendering options passed through to [`Exportable::export`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Output size in pixels.
    pub size: (u32, u32),
    /// Shrink outer margins to the content.
    pub tight: bool,
    /// Frame rate for animations. `None` keeps the handle's own interval.
    pub fps: Option<u32>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: (1000, 800),
            tight: true,
            fps: None,
        }
    }
}

impl RenderOptions {
    /// Set the output size.
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Set the frame rate.
    pub const fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Margin around the drawing, in pixels.
    pub const fn margin(&self) -> u32 {
        if self.tight { 5 } else { 20 }
    }
}

/// A renderable handle that can write itself to a file.
///
/// The target format is chosen from the extension of `path`.
pub trait Exportable {
    /// Render to `path`.
    fn export(&self, path: &Path, options: &RenderOptions) -> ToolboxResult<()>;
}

/// Save a figure under `name` in the folder described by `path`.
///
/// `.png` is appended when `name` has no extension. Returns the full path.
pub fn save_figure<H, P>(handle: &H, name: &str, path: P, options: &RenderOptions) -> ToolboxResult<PathBuf>
where
    H: Exportable + ?Sized,
    P: Into<PathSpec>,
{
    let folder = path.into().resolve()?;
    let full_path = folder.join(with_default_extension(name, DEFAULT_FIGURE_EXTENSION));
    handle.export(&full_path, options)?;
    debug!(path = %full_path.display(), "saved figure");
    Ok(full_path)
}

/// Save an animation under `name` in the folder described by `path`.
///
/// `.gif` is appended when `name` has no extension. `fps` overrides the frame
/// rate in `options`. Returns the full path.
pub fn save_animation<H, P>(
    handle: &H,
    name: &str,
    path: P,
    fps: Option<u32>,
    options: &RenderOptions,
) -> ToolboxResult<PathBuf>
where
    H: Exportable + ?Sized,
    P: Into<PathSpec>,
{
    let folder = path.into().resolve()?;
    let full_path = folder.join(with_default_extension(name, DEFAULT_ANIMATION_EXTENSION));
    let options = RenderOptions {
        fps: fps.or(options.fps),
        ..*options
    };
    handle.export(&full_path, &options)?;
    debug!(path = %full_path.display(), fps = ?options.fps, "saved animation");
    Ok(full_path)
}

fn with_default_extension(name: &str, default: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{name}{default}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(PathBuf, RenderOptions)>>,
    }

    impl Exportable for Recorder {
        fn export(&self, path: &Path, options: &RenderOptions) -> ToolboxResult<()> {
            self.calls.borrow_mut().push((path.to_path_buf(), *options));
            Ok(())
        }
    }

    #[test]
    fn test_figure_gets_default_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let handle = Recorder::default();
        let path = save_figure(&handle, "plot", tmp.path(), &RenderOptions::default()).unwrap();
        assert_eq!(path, tmp.path().join("plot.png"));
        assert_eq!(handle.calls.borrow()[0].0, path);
        assert!(handle.calls.borrow()[0].1.tight);
    }

    #[test]
    fn test_explicit_extension_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let handle = Recorder::default();
        let path = save_figure(&handle, "plot.pdf", tmp.path(), &RenderOptions::default()).unwrap();
        assert_eq!(path, tmp.path().join("plot.pdf"));
    }

    #[test]
    fn test_animation_extension_and_fps() {
        let tmp = tempfile::tempdir().unwrap();
        let handle = Recorder::default();
        let options = RenderOptions::default().with_fps(5);

        let path = save_animation(&handle, "movie", tmp.path(), None, &options).unwrap();
        assert_eq!(path, tmp.path().join("movie.gif"));
        assert_eq!(handle.calls.borrow()[0].1.fps, Some(5));

        save_animation(&handle, "movie.mp4", tmp.path(), Some(24), &options).unwrap();
        let calls = handle.calls.borrow();
        assert_eq!(calls[1].0, tmp.path().join("movie.mp4"));
        assert_eq!(calls[1].1.fps, Some(24));
    }

    #[test]
    fn test_nested_folder_is_created_before_export() {
        let tmp = tempfile::tempdir().unwrap();
        let handle = Recorder::default();
        let folder = tmp.path().join("figs");
        let path = save_figure(&handle, "a", vec![folder.clone(), "b".into()], &RenderOptions::default())
            .unwrap();
        assert_eq!(path, folder.join("b").join("a.png"));
        assert!(folder.join("b").is_dir());
    }
}
