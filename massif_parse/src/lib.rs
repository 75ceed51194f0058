//! Valgrind Massif output parser library.
//!
//! This library reads Massif heap profile output (`massif.out.<pid>`) from any
//! `Read`-able source, splitting it into the file-level header lines and the
//! timestamped snapshot blocks, and writes those pieces back out in the same
//! text format.
//!
//! Lines are handled as raw bytes. The body of a snapshot is kept verbatim,
//! whatever its encoding; the only value extracted from it is the `time=<N>`
//! field used for ordering.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use massif_parse::ParsedMassif;
//!
//! let file = File::open("massif.out.1234").unwrap();
//! let massif = ParsedMassif::parse(file, true).unwrap();
//!
//! println!("Header lines: {}", massif.headers.len());
//! println!("Snapshots: {}", massif.snapshots.len());
//! ```

use regex::bytes::Regex;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::num::ParseIntError;
use std::sync::LazyLock;
use thiserror::Error;

/// Delimiter line surrounding every `snapshot=<N>` line.
pub const SNAPSHOT_MARK: &[u8] = b"#-----------";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(desc|cmd|time_unit):").expect("valid header regex"));
static SNAPSHOT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"snapshot=[0-9]+").expect("valid snapshot regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=([0-9]+)").expect("valid time regex"));

/// Errors that can occur during Massif parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot opened at line {line} while another snapshot is still open")]
    SnapshotAlreadyOpen { line: usize },

    #[error("invalid snapshot time at line {line}: {source}")]
    InvalidTime {
        line: usize,
        #[source]
        source: ParseIntError,
    },
}

impl ParseError {
    /// True when the input itself is malformed, as opposed to unreadable.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ParseError::Io(_))
    }
}

/// Result type for Massif parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

// ============================================================================
// Snapshot records
// ============================================================================

/// One heap profile sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Value of the last `time=<N>` line in the body, 0 if there was none.
    pub time: u64,
    /// Body lines in file order, without the marker and `snapshot=` lines.
    pub contents: Vec<Vec<u8>>,
}

impl Snapshot {
    /// Build a snapshot from body lines, picking up the `time=` field.
    pub fn from_lines<I, S>(lines: I) -> std::result::Result<Self, ParseIntError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        let mut snapshot = Snapshot::default();
        for line in lines {
            let line = line.into();
            if let Some(time) = parse_time(&line)? {
                snapshot.time = time;
            }
            snapshot.contents.push(line);
        }
        Ok(snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Extract the value of a `time=<digits>` field from a body line.
///
/// Returns `Ok(None)` when the line has no such field and an error when the
/// digits do not fit in a `u64`.
pub fn parse_time(line: &[u8]) -> std::result::Result<Option<u64>, ParseIntError> {
    match TIME_RE.captures(line) {
        Some(caps) => String::from_utf8_lossy(&caps[1]).parse().map(Some),
        None => Ok(None),
    }
}

// ============================================================================
// Line state machine
// ============================================================================

/// What the previous significant line was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    None,
    Header,
    SnapshotMark,
    SnapshotName,
    SnapshotContent,
}

/// Side effect of consuming one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The line carries nothing we keep.
    Ignore,
    /// A `desc:`, `cmd:` or `time_unit:` line.
    Header,
    /// A marker ending the current snapshot body.
    CloseSnapshot,
    /// The marker after `snapshot=<N>`, starting a new body.
    OpenSnapshot,
    /// A body line of the open snapshot.
    Content,
}

/// Classify `line` given the current state.
///
/// Header keyword lines always win, so a preamble repeated mid-file never
/// ends up inside a snapshot body.
pub fn transition(state: State, line: &[u8]) -> (State, Action) {
    if HEADER_RE.is_match(line) {
        return (State::Header, Action::Header);
    }

    match state {
        State::None | State::Header | State::SnapshotContent if line == SNAPSHOT_MARK => {
            (State::SnapshotMark, Action::CloseSnapshot)
        }
        State::SnapshotMark if SNAPSHOT_NAME_RE.is_match(line) => {
            (State::SnapshotName, Action::Ignore)
        }
        State::SnapshotName if line == SNAPSHOT_MARK => {
            (State::SnapshotContent, Action::OpenSnapshot)
        }
        State::SnapshotContent => (State::SnapshotContent, Action::Content),
        other => (other, Action::Ignore),
    }
}

/// Incremental parser for a single Massif file.
///
/// Header lines and completed snapshots are pushed into the destination as
/// soon as they are recognized, so anything emitted before an error stays in
/// the destination.
#[derive(Debug)]
pub struct SnapshotParser {
    state: State,
    open: Option<Snapshot>,
    line_num: usize,
    capture_headers: bool,
}

impl SnapshotParser {
    /// Create a parser; header lines are only kept when `capture_headers` is set.
    pub fn new(capture_headers: bool) -> Self {
        Self {
            state: State::None,
            open: None,
            line_num: 0,
            capture_headers,
        }
    }

    /// Current state of the line classifier.
    pub fn state(&self) -> State {
        self.state
    }

    /// Consume the next line of the file, without its line terminator.
    pub fn feed(&mut self, line: Vec<u8>, dest: &mut ParsedMassif) -> Result<()> {
        self.line_num += 1;
        let (next, action) = transition(self.state, &line);
        self.state = next;

        match action {
            Action::Ignore => {}
            Action::Header => {
                if self.capture_headers {
                    dest.headers.push(line);
                }
            }
            Action::CloseSnapshot => {
                // An empty body stays open; it is either filled later or
                // collides with the next snapshot.
                if self.open.as_ref().is_some_and(|s| !s.is_empty()) {
                    dest.snapshots.extend(self.open.take());
                }
            }
            Action::OpenSnapshot => {
                if self.open.is_some() {
                    return Err(ParseError::SnapshotAlreadyOpen {
                        line: self.line_num,
                    });
                }
                self.open = Some(Snapshot::default());
            }
            Action::Content => {
                let time = parse_time(&line).map_err(|source| ParseError::InvalidTime {
                    line: self.line_num,
                    source,
                })?;
                let snapshot = self.open.get_or_insert_with(Snapshot::default);
                if let Some(time) = time {
                    snapshot.time = time;
                }
                snapshot.contents.push(line);
            }
        }

        Ok(())
    }

    /// Close out the file, keeping a trailing snapshot that has a body.
    pub fn finish(self, dest: &mut ParsedMassif) {
        if let Some(snapshot) = self.open {
            if !snapshot.is_empty() {
                dest.snapshots.push(snapshot);
            }
        }
    }
}

/// Drop a trailing `\n` or `\r\n`.
fn trim_line_end(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

// ============================================================================
// Main ParsedMassif type
// ============================================================================

/// Header lines and snapshots read from one or more Massif files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMassif {
    /// `desc:`, `cmd:` and `time_unit:` lines in the order they were read.
    pub headers: Vec<Vec<u8>>,
    /// Snapshots in the order they were read.
    pub snapshots: Vec<Snapshot>,
}

impl ParsedMassif {
    /// Parse a Massif file from any `Read`-able source.
    pub fn parse<R: Read>(reader: R, capture_headers: bool) -> Result<Self> {
        let mut massif = ParsedMassif::default();
        Self::parse_into(reader, capture_headers, &mut massif)?;
        Ok(massif)
    }

    /// Parse a Massif file, appending its headers and snapshots to `dest`.
    ///
    /// On error, whatever was recognized before the failing line is left in
    /// `dest`.
    pub fn parse_into<R: Read>(
        reader: R,
        capture_headers: bool,
        dest: &mut ParsedMassif,
    ) -> Result<()> {
        let mut buf_reader = BufReader::new(reader);
        let mut parser = SnapshotParser::new(capture_headers);

        loop {
            let mut line = Vec::new();
            if buf_reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            trim_line_end(&mut line);
            parser.feed(line, dest)?;
        }

        parser.finish(dest);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.snapshots.is_empty()
    }

    /// Smallest and largest snapshot time, if there are any snapshots.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        let min = self.snapshots.iter().map(|s| s.time).min()?;
        let max = self.snapshots.iter().map(|s| s.time).max()?;
        Some((min, max))
    }

    /// Stable sort of the snapshots by time.
    pub fn sort_by_time(&mut self) {
        self.snapshots.sort_by_key(|s| s.time);
    }

    /// Write headers and snapshots in their current order.
    pub fn write<W: Write>(&self, writer: W) -> io::Result<()> {
        write_massif(writer, &self.headers, &self.snapshots)
    }
}

// ============================================================================
// Writer types
// ============================================================================

/// Write a complete Massif file, numbering snapshots from 0 in slice order.
pub fn write_massif<W: Write>(
    writer: W,
    headers: &[Vec<u8>],
    snapshots: &[Snapshot],
) -> io::Result<()> {
    let mut massif_writer = MassifWriter::new(writer);
    for header in headers {
        massif_writer.write_header(header)?;
    }
    for snapshot in snapshots {
        massif_writer.write_snapshot(snapshot)?;
    }
    Ok(())
}

/// Writer for creating Massif files incrementally.
///
/// Snapshot indices are assigned by the writer, so the output is always
/// numbered `0..N` regardless of where the snapshots came from.
///
/// # Example
///
/// ```no_run
/// use massif_parse::{MassifWriter, Snapshot};
/// use std::fs::File;
///
/// let file = File::create("massif.out.combine").unwrap();
/// let mut writer = MassifWriter::new(file);
///
/// writer.write_header(b"desc: (none)").unwrap();
/// writer.write_header(b"cmd: ./app").unwrap();
/// writer.write_header(b"time_unit: i").unwrap();
///
/// let snapshot = Snapshot::from_lines(["time=0", "mem_heap_B=0"]).unwrap();
/// writer.write_snapshot(&snapshot).unwrap();
/// ```
pub struct MassifWriter<W: Write> {
    writer: W,
    next_index: usize,
}

impl<W: Write> MassifWriter<W> {
    /// Create a new Massif writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_index: 0,
        }
    }

    /// Write one header line.
    pub fn write_header(&mut self, line: &[u8]) -> io::Result<()> {
        self.write_line(line)
    }

    /// Write a snapshot block and return the index it was given.
    pub fn write_snapshot(&mut self, snapshot: &Snapshot) -> io::Result<usize> {
        let index = self.next_index;
        self.write_line(SNAPSHOT_MARK)?;
        writeln!(self.writer, "snapshot={}", index)?;
        self.write_line(SNAPSHOT_MARK)?;
        for line in &snapshot.contents {
            self.write_line(line)?;
        }
        self.next_index += 1;
        Ok(index)
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")
    }

    /// Number of snapshots written so far.
    pub fn snapshots_written(&self) -> usize {
        self.next_index
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consume this writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
