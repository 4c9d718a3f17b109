use super::Columns;
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Settlement line writer: no header row, every field double-quoted,
/// comma separated and `\n` terminated.
pub struct FileSink<W: Write = File> {
    writer: Writer<W>,
}

impl<W: Write> FileSink<W> {
    pub fn new(inner: W) -> Self {
        let writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);
        Self { writer }
    }

    /// One line, columns in name order.
    pub fn write_columns(&mut self, columns: &Columns) -> io::Result<()> {
        self.writer.write_record(columns.values())?;
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl FileSink<File> {
    /// Create or truncate.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }

    pub fn append(path: &Path) -> io::Result<Self> {
        Ok(Self::new(OpenOptions::new().append(true).open(path)?))
    }
}
