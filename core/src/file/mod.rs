//! Flat-file generation for the settlement system.
//!
//! Every file is one head line, N body lines and one tail line. Each line
//! is a presenter's named columns, sorted by name, double-quoted,
//! comma-joined and newline-terminated, with embedded quotes doubled.

mod pipeline;
mod sink;

pub use pipeline::{generate, serialize_row, Columns, FilePresenter, GeneratedFile};
pub use sink::FileSink;

/// `{reference}.dat`
pub fn file_name(file_reference: &str) -> String {
    format!("{file_reference}.dat")
}
