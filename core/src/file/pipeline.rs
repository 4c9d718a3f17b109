use super::sink::FileSink;
use crate::error::{ChargingError, ChargingResult};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Named columns of one line. Keys are `col01`, `col02`, ...; the map's
/// ordering is the output ordering.
pub type Columns = BTreeMap<&'static str, String>;

/// Maps a file's shared context and its records to lines.
///
/// `index` is the line's position in the file: the head is 0, body lines
/// run from 1 and the tail gets the count of lines before it.
pub trait FilePresenter {
    type Context;
    type Record;

    fn head(&self, ctx: &Self::Context, index: usize) -> Columns;
    fn body(&self, ctx: &Self::Context, record: &Self::Record, index: usize) -> Columns;
    fn tail(&self, ctx: &Self::Context, index: usize) -> Columns;
}

/// A written file and how many body lines it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub body_lines: usize,
}

/// One line as it appears in a file: `"a","b","c"\n`.
pub fn serialize_row(columns: &Columns) -> io::Result<String> {
    let mut sink = FileSink::new(Vec::new());
    sink.write_columns(columns)?;
    let bytes = sink.finish()?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn file_error(path: &Path) -> impl Fn(io::Error) -> ChargingError + '_ {
    move |source| ChargingError::FileGeneration {
        filename: path.display().to_string(),
        source,
    }
}

fn write_phases<P, I>(presenter: &P, ctx: &P::Context, records: I, path: &Path) -> ChargingResult<usize>
where
    P: FilePresenter,
    I: Iterator<Item = ChargingResult<P::Record>>,
{
    let io_err = file_error(path);

    // Head: a fresh file.
    let mut sink = FileSink::create(path).map_err(&io_err)?;
    sink.write_columns(&presenter.head(ctx, 0)).map_err(&io_err)?;
    sink.finish().map_err(&io_err)?;

    // Body: one line per record, in the order the source yields them.
    let mut sink = FileSink::append(path).map_err(&io_err)?;
    let count = records
        .enumerate()
        .try_fold(0usize, |count, (i, record)| -> ChargingResult<usize> {
            let columns = presenter.body(ctx, &record?, i + 1);
            sink.write_columns(&columns).map_err(&io_err)?;
            Ok(count + 1)
        })?;
    sink.finish().map_err(&io_err)?;

    // Tail: sees the final count.
    let mut sink = FileSink::append(path).map_err(&io_err)?;
    sink.write_columns(&presenter.tail(ctx, count + 1))
        .map_err(&io_err)?;
    sink.finish().map_err(&io_err)?;

    Ok(count)
}

/// Write a complete file at `path`. A failure part way through removes
/// whatever was written.
pub fn generate<P, I>(presenter: &P, ctx: &P::Context, records: I, path: &Path) -> ChargingResult<GeneratedFile>
where
    P: FilePresenter,
    I: Iterator<Item = ChargingResult<P::Record>>,
{
    match write_phases(presenter, ctx, records, path) {
        Ok(body_lines) => {
            log::debug!("generated file: path={} body_lines={body_lines}", path.display());
            Ok(GeneratedFile {
                path: path.to_path_buf(),
                body_lines,
            })
        }
        Err(e) => {
            log::warn!("file generation failed: path={} error={e}", path.display());
            let _ = fs::remove_file(path);
            Err(e)
        }
    }
}
