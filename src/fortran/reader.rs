//! Lazy decoding of line streams and files.
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter::FusedIterator;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::bernese_errors::BerneseError;

use super::format::FortranFormat;
use super::record::Record;

/// Line iterator over an opened (possibly gzip compressed) text file.
pub type FileLines = RawLines<Box<dyn BufRead>>;

/// Record iterator over an opened file, see [`FortranFormat::read_file`].
pub type FileRecordIter<'f> = RecordIter<'f, FileLines>;

/// Options controlling how a stream of lines is turned into records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Drop lines whose numeric fields fail to decode instead of stopping.
    pub skip_errors: bool,
    /// Drop lines that are empty after trimming, before decoding is attempted.
    pub skip_blanks: bool,
    /// Number of leading lines discarded unconditionally.
    pub skip_lines: usize,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_errors(mut self, skip_errors: bool) -> Self {
        self.skip_errors = skip_errors;
        self
    }

    pub fn with_skip_blanks(mut self, skip_blanks: bool) -> Self {
        self.skip_blanks = skip_blanks;
        self
    }

    pub fn with_skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = skip_lines;
        self
    }
}

/// Open a text file for line reading, decompressing it if the name ends with `.gz`.
///
/// The file is closed when the returned reader is dropped.
pub fn open_text_file(path: &Utf8Path) -> Result<Box<dyn BufRead>, BerneseError> {
    let file = File::open(path).map_err(|e| BerneseError::io(path, e))?;
    if path.as_str().ends_with(".gz") {
        debug!(path = %path, "Opening gzip compressed file");
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        debug!(path = %path, "Opening file");
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Lines of a reader as raw bytes, without their `\n` terminator.
///
/// Bernese files are not always valid UTF-8 (station descriptions in Latin-1 are common),
/// so lines are split on bytes and only decoded when a record is read from them.
#[derive(Debug)]
pub struct RawLines<R> {
    reader: R,
}

impl<R: BufRead> RawLines<R> {
    pub fn new(reader: R) -> Self {
        RawLines { reader }
    }
}

impl<R: BufRead> Iterator for RawLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Text of a raw line: a trailing `\r` is dropped and invalid UTF-8 bytes are replaced
/// by `U+FFFD`, one character per byte, so Latin-1 columns stay aligned.
pub(crate) fn line_text(line: &[u8]) -> Cow<'_, str> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line)
}

/// Lazy, forward-only iterator decoding one line at a time.
///
/// Yields `Err` for I/O failures, and for decode failures when `skip_errors` is unset;
/// the iterator is exhausted after the first error it yields. Lines may be `String`s or
/// raw bytes; header lines are discarded without being decoded.
pub struct RecordIter<'f, L> {
    format: &'f FortranFormat,
    lines: L,
    source: Utf8PathBuf,
    pending_skip: usize,
    skip_errors: bool,
    skip_blanks: bool,
    line_number: usize,
    done: bool,
}

impl<'f, L, T> RecordIter<'f, L>
where
    L: Iterator<Item = io::Result<T>>,
    T: AsRef<[u8]>,
{
    fn new(
        format: &'f FortranFormat,
        lines: L,
        options: &ReadOptions,
        source: Utf8PathBuf,
    ) -> Self {
        RecordIter {
            format,
            lines,
            source,
            pending_skip: options.skip_lines,
            skip_errors: options.skip_errors,
            skip_blanks: options.skip_blanks,
            line_number: 0,
            done: false,
        }
    }

    fn next_line(&mut self) -> Option<Result<T, BerneseError>> {
        let line = self.lines.next()?;
        self.line_number += 1;
        Some(line.map_err(|e| BerneseError::io(self.source.clone(), e)))
    }
}

impl<L, T> Iterator for RecordIter<'_, L>
where
    L: Iterator<Item = io::Result<T>>,
    T: AsRef<[u8]>,
{
    type Item = Result<Record, BerneseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while self.pending_skip > 0 {
            self.pending_skip -= 1;
            match self.next_line() {
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }

        loop {
            let line = match self.next_line() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            let text = line_text(line.as_ref());

            if self.skip_blanks && text.trim().is_empty() {
                continue;
            }

            match self.format.read(&text) {
                Ok(record) => return Some(Ok(record)),
                Err(e) if self.skip_errors => {
                    trace!(
                        source = %self.source,
                        line = self.line_number,
                        error = %e,
                        "Skipping record"
                    );
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<L, T> FusedIterator for RecordIter<'_, L>
where
    L: Iterator<Item = io::Result<T>>,
    T: AsRef<[u8]>,
{
}

impl FortranFormat {
    /// Decode a stream of lines lazily.
    ///
    /// Arguments
    /// -----------------
    /// * `lines` – Lines without their terminators, as `String`s or bytes (a trailing `\r`
    ///   is tolerated).
    /// * `options` – Blank/error skipping and the number of leading lines to discard.
    ///
    /// Return
    /// ----------
    /// * A [`RecordIter`] preserving line order.
    pub fn iter_lines<I, T>(&self, lines: I, options: &ReadOptions) -> RecordIter<'_, I::IntoIter>
    where
        I: IntoIterator<Item = io::Result<T>>,
        T: AsRef<[u8]>,
    {
        RecordIter::new(self, lines.into_iter(), options, Utf8PathBuf::from("<stream>"))
    }

    /// Decode the lines of a buffered reader lazily.
    pub fn iter_reader<R: BufRead>(
        &self,
        reader: R,
        options: &ReadOptions,
    ) -> RecordIter<'_, RawLines<R>> {
        self.iter_lines(RawLines::new(reader), options)
    }

    /// Open a file and decode its lines lazily.
    ///
    /// Files whose name ends with `.gz` are decompressed on the fly. The first
    /// `options.skip_lines` lines are discarded whatever their content. The file is
    /// closed when the iterator is dropped, whether or not it was exhausted.
    ///
    /// Return
    /// ----------
    /// * A [`FileRecordIter`], or [`BerneseError::Io`] if the file cannot be opened.
    pub fn read_file(
        &self,
        path: &Utf8Path,
        options: &ReadOptions,
    ) -> Result<FileRecordIter<'_>, BerneseError> {
        let reader = open_text_file(path)?;
        Ok(RecordIter::new(
            self,
            RawLines::new(reader),
            options,
            path.to_path_buf(),
        ))
    }

    /// Decode the remaining lines of an already opened file.
    pub(crate) fn iter_file_lines<'f>(
        &'f self,
        lines: FileLines,
        options: &ReadOptions,
        path: &Utf8Path,
    ) -> FileRecordIter<'f> {
        RecordIter::new(self, lines, options, path.to_path_buf())
    }
}
