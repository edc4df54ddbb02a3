//! Miscellaneous helpers for experiment scripts.

pub mod log;

pub use log::{
    DEFAULT_LOG_EXTENSION, StreamDuplication, Tee, WriteMode, duplicate_stdout_stream_to_file,
    make_header, make_header_with,
};
