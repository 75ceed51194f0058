//! Accumulate snapshots from several Massif files and write them as one.
//!
//! Massif writes one file per run (or per `detailed_snapshot` monitor
//! command). [`MassifFile`] collects the snapshots of all those files, keeps
//! the header of the first file that has one, and writes a single output
//! whose snapshots are ordered by time and numbered `0..N`.

use crate::error::{CombineError, Result};
use massif_parse::{ParsedMassif, Snapshot};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Snapshots and header lines gathered across input files.
#[derive(Debug, Default)]
pub struct MassifFile {
    massif: ParsedMassif,
    sources: Vec<PathBuf>,
}

impl MassifFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the Massif file at `path` and merge it in.
    ///
    /// Header lines are only taken from this file if none have been captured
    /// yet. If parsing fails part way, the snapshots completed before the
    /// failure are kept.
    pub fn add<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CombineError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        self.add_reader(file)
            .map_err(|source| CombineError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        self.sources.push(path.to_path_buf());
        debug!(
            "added {} (snapshots so far: {})",
            path.display(),
            self.snapshot_count()
        );
        Ok(())
    }

    /// Merge Massif output from any `Read`-able source.
    pub fn add_reader<R: Read>(&mut self, reader: R) -> massif_parse::Result<()> {
        let capture_headers = self.massif.headers.is_empty();
        ParsedMassif::parse_into(reader, capture_headers, &mut self.massif)
    }

    /// Add every path in order, carrying on past failures.
    ///
    /// Returns the error of each path that could not be fully added.
    pub fn add_all<I, P>(&mut self, paths: I) -> Vec<CombineError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter_map(|path| self.add(path).err())
            .collect()
    }

    pub fn headers(&self) -> &[Vec<u8>] {
        &self.massif.headers
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.massif.snapshots
    }

    pub fn snapshot_count(&self) -> usize {
        self.massif.snapshots.len()
    }

    /// Paths whose `add` completed without error.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.massif.is_empty()
    }

    /// Sort the snapshots by time and write the combined file to `path`.
    ///
    /// Nothing is created when there is nothing to write. Returns the number
    /// of snapshots written.
    pub fn write<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        if self.is_empty() {
            return Err(CombineError::Empty);
        }

        self.massif.sort_by_time();

        let file = File::create(path).map_err(|source| CombineError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        self.massif
            .write(&mut writer)
            .map_err(|source| CombineError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        writer.into_inner().map_err(|e| CombineError::Close {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;

        info!(
            "wrote {} snapshots to {}",
            self.snapshot_count(),
            path.display()
        );
        Ok(self.snapshot_count())
    }

    /// Sort the snapshots by time and write the combined file to `writer`.
    pub fn write_to<W: Write>(&mut self, mut writer: W) -> Result<usize> {
        if self.is_empty() {
            return Err(CombineError::Empty);
        }

        self.massif.sort_by_time();
        self.massif.write(&mut writer)?;
        writer.flush()?;
        Ok(self.snapshot_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FIRST: &str = "\
desc: (none)
cmd: ./app
time_unit: i
#-----------
snapshot=0
#-----------
time=100
mem_heap_B=500
";

    const SECOND: &str = "\
#-----------
snapshot=0
#-----------
time=50
mem_heap_B=300
";

    fn combined(inputs: &[&str]) -> MassifFile {
        let mut massif = MassifFile::new();
        for input in inputs {
            massif.add_reader(Cursor::new(*input)).unwrap();
        }
        massif
    }

    fn output_of(massif: &mut MassifFile) -> String {
        let mut out = Vec::new();
        massif.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn snapshots_are_merged_by_time() {
        let mut massif = combined(&[FIRST, SECOND]);

        assert_eq!(
            output_of(&mut massif),
            "\
desc: (none)
cmd: ./app
time_unit: i
#-----------
snapshot=0
#-----------
time=50
mem_heap_B=300
#-----------
snapshot=1
#-----------
time=100
mem_heap_B=500
"
        );
    }

    #[test]
    fn only_first_header_is_kept() {
        let other = FIRST.replace("cmd: ./app", "cmd: ./other");
        let massif = combined(&[FIRST, other.as_str()]);

        assert_eq!(
            massif.headers(),
            [
                b"desc: (none)".to_vec(),
                b"cmd: ./app".to_vec(),
                b"time_unit: i".to_vec()
            ]
        );
        assert_eq!(massif.snapshot_count(), 2);
    }

    #[test]
    fn header_taken_from_first_file_that_has_one() {
        let massif = combined(&[SECOND, FIRST]);

        assert_eq!(massif.headers().len(), 3);
        assert_eq!(massif.snapshot_count(), 2);
    }

    #[test]
    fn equal_times_keep_arrival_order() {
        let a = "#-----------\nsnapshot=0\n#-----------\ntime=5\nfrom=a\n";
        let b = "#-----------\nsnapshot=0\n#-----------\ntime=5\nfrom=b\n";
        let mut massif = combined(&[a, b]);
        massif.write_to(std::io::sink()).unwrap();

        assert_eq!(massif.snapshots()[0].contents[1], b"from=a");
        assert_eq!(massif.snapshots()[1].contents[1], b"from=b");
    }

    #[test]
    fn empty_accumulator_refuses_to_write() {
        let mut massif = MassifFile::new();
        let mut out = Vec::new();

        assert!(matches!(massif.write_to(&mut out), Err(CombineError::Empty)));
        assert!(out.is_empty());
    }

    #[test]
    fn headers_alone_are_written() {
        let mut massif = combined(&["desc: x\ncmd: y\n"]);

        assert_eq!(output_of(&mut massif), "desc: x\ncmd: y\n");
    }

    #[test]
    fn failed_reader_keeps_partial_content() {
        let broken = "\
desc: x
#-----------
snapshot=0
#-----------
time=10
#-----------
snapshot=1
#-----------
#-----------
snapshot=2
#-----------
";
        let mut massif = MassifFile::new();
        let err = massif.add_reader(Cursor::new(broken)).unwrap_err();

        assert!(err.is_malformed());
        assert_eq!(massif.snapshot_count(), 1);
        assert_eq!(massif.headers(), [b"desc: x".to_vec()]);

        massif.add_reader(Cursor::new(SECOND)).unwrap();
        assert_eq!(massif.snapshot_count(), 2);
    }
}
