//! CSV persistence shared by the pipeline phases.
//!
//! Phases hand work to each other exclusively through files in one output
//! directory; the naming convention below is the only coordination. Every
//! file is staged next to its destination and renamed into place, so a
//! crashed phase never leaves a truncated file under a final name.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use monument_survey_core::{ChunkCoord, MonumentResult};
use tempfile::NamedTempFile;

use crate::PipelineError;

/// Header of candidate files.
pub const CANDIDATE_HEADER: &str = "chunk_x,chunk_z";
/// Header of partial and merged result files.
pub const RESULT_HEADER: &str = "x,z,inferred_sponge_rooms";
/// Default candidate file name inside the output directory.
pub const CANDIDATES_FILE: &str = "candidates.csv";
/// Merged result file name inside the output directory.
pub const MERGED_FILE: &str = "results.csv";

const PARTIAL_PREFIX: &str = "results_part_";
const CSV_SUFFIX: &str = ".csv";

/// File layout of one survey output directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultStore {
    dir: PathBuf,
    candidates: PathBuf,
}

impl ResultStore {
    /// Store rooted at `dir`, using the default candidate file name.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let candidates = dir.join(CANDIDATES_FILE);
        Self { dir, candidates }
    }

    /// Overrides the candidate file location.
    #[must_use]
    pub fn with_candidates_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates = path.into();
        self
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Candidate file written by discover and read by analyze.
    #[must_use]
    pub fn candidates_path(&self) -> &Path {
        &self.candidates
    }

    /// Partial result file owned by the batch starting at `batch_start`.
    #[must_use]
    pub fn partial_path(&self, batch_start: usize) -> PathBuf {
        self.dir.join(format!("{PARTIAL_PREFIX}{batch_start}{CSV_SUFFIX}"))
    }

    /// Final merged result file.
    #[must_use]
    pub fn merged_path(&self) -> PathBuf {
        self.dir.join(MERGED_FILE)
    }

    /// Every partial result file currently present, ordered by batch start.
    ///
    /// A missing directory holds no partial files.
    pub fn partial_files(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PipelineError::io(&self.dir, err)),
        };

        let mut partials = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| PipelineError::io(&self.dir, err))?;
            let name = entry.file_name();
            if let Some(start) = name.to_str().and_then(partial_batch_start) {
                partials.push((start, entry.path()));
            }
        }
        partials.sort();
        Ok(partials.into_iter().map(|(_, path)| path).collect())
    }

    /// Deletes the candidate file and every partial result file.
    ///
    /// Existence alone triggers deletion. Returns the number of files removed.
    pub fn clear_intermediates(&self) -> Result<usize, PipelineError> {
        let mut removed = usize::from(remove_if_exists(&self.candidates)?);
        for partial in self.partial_files()? {
            removed += usize::from(remove_if_exists(&partial)?);
        }
        Ok(removed)
    }
}

fn partial_batch_start(name: &str) -> Option<usize> {
    name.strip_prefix(PARTIAL_PREFIX)?
        .strip_suffix(CSV_SUFFIX)?
        .parse()
        .ok()
}

fn remove_if_exists(path: &Path) -> Result<bool, PipelineError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(PipelineError::io(path, err)),
    }
}

/// Writes candidate chunks, one `chunk_x,chunk_z` row each.
pub fn write_candidates(path: &Path, candidates: &[ChunkCoord]) -> Result<(), PipelineError> {
    write_rows(path, CANDIDATE_HEADER, candidates, |out, chunk| {
        writeln!(out, "{},{}", chunk.x(), chunk.z())
    })
}

/// Reads candidate chunks, skipping an optional header row.
pub fn read_candidates(path: &Path) -> Result<Vec<ChunkCoord>, PipelineError> {
    read_rows(path, CANDIDATE_HEADER, |fields| match fields {
        [x, z] => Ok(ChunkCoord::new(parse_field(x)?, parse_field(z)?)),
        _ => Err(format!("expected 2 fields, found {}", fields.len())),
    })
}

/// Writes result rows in the order given.
pub fn write_results(path: &Path, results: &[MonumentResult]) -> Result<(), PipelineError> {
    write_rows(path, RESULT_HEADER, results, |out, result| {
        writeln!(out, "{},{},{}", result.x(), result.z(), result.rooms())
    })
}

/// Reads result rows, skipping an optional header row.
pub fn read_results(path: &Path) -> Result<Vec<MonumentResult>, PipelineError> {
    read_rows(path, RESULT_HEADER, |fields| match fields {
        [x, z, rooms] => Ok(MonumentResult::new(
            parse_field(x)?,
            parse_field(z)?,
            parse_field(rooms)?,
        )),
        _ => Err(format!("expected 3 fields, found {}", fields.len())),
    })
}

fn write_rows<T, F>(
    path: &Path,
    header: &str,
    rows: &[T],
    write_row: F,
) -> Result<(), PipelineError>
where
    F: FnMut(&mut BufWriter<&File>, &T) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(|err| PipelineError::io(dir, err))?;
    {
        let mut out = BufWriter::new(staged.as_file());
        emit_rows(&mut out, header, rows, write_row)
            .map_err(|err| PipelineError::io(path, err))?;
    }
    let _ = staged
        .persist(path)
        .map_err(|err| PipelineError::io(path, err.error))?;
    Ok(())
}

fn emit_rows<W, T, F>(out: &mut W, header: &str, rows: &[T], mut write_row: F) -> io::Result<()>
where
    W: Write,
    F: FnMut(&mut W, &T) -> io::Result<()>,
{
    writeln!(out, "{header}")?;
    for row in rows {
        write_row(out, row)?;
    }
    out.flush()
}

fn read_rows<T, F>(path: &Path, header: &str, mut parse_row: F) -> Result<Vec<T>, PipelineError>
where
    F: FnMut(&[&str]) -> Result<T, String>,
{
    let contents = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
    let mut rows = Vec::new();
    let mut header_allowed = true;
    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if std::mem::take(&mut header_allowed) && line.eq_ignore_ascii_case(header) {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let row = parse_row(&fields).map_err(|message| PipelineError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            message,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn parse_field<T>(field: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    field
        .parse()
        .map_err(|err| format!("invalid value `{field}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_names_encode_batch_start() {
        let store = ResultStore::new("/tmp/survey");
        let path = store.partial_path(250);
        let name = path.file_name().and_then(|n| n.to_str()).expect("utf-8 name");
        assert_eq!(name, "results_part_250.csv");
        assert_eq!(partial_batch_start(name), Some(250));
        assert_eq!(partial_batch_start("results.csv"), None);
        assert_eq!(partial_batch_start("results_part_x.csv"), None);
    }

    #[test]
    fn header_detection_ignores_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("candidates.csv");
        fs::write(&path, "CHUNK_X,Chunk_Z\n12,18\n\n-13,-24\n").expect("write");

        let candidates = read_candidates(&path).expect("read");
        assert_eq!(candidates, vec![ChunkCoord::new(12, 18), ChunkCoord::new(-13, -24)]);
    }

    #[test]
    fn headerless_files_are_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("candidates.csv");
        fs::write(&path, "1,2\n3,4\n").expect("write");

        assert_eq!(read_candidates(&path).expect("read").len(), 2);
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results_part_0.csv");
        fs::write(&path, "x,z,inferred_sponge_rooms\n200,296,3\n8,oops,1\n").expect("write");

        match read_results(&path) {
            Err(PipelineError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn results_survive_a_write_read_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(MERGED_FILE);
        let rows = vec![
            MonumentResult::new(200, 296, 3),
            MonumentResult::new(-200, -376, 0),
            MonumentResult::new(8, 8, 8),
        ];

        write_results(&path, &rows).expect("write");
        assert_eq!(read_results(&path).expect("read"), rows);
    }

    #[test]
    fn rewrites_replace_the_file_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(MERGED_FILE);

        write_results(&path, &[MonumentResult::new(1, 2, 3)]).expect("first write");
        write_results(&path, &[MonumentResult::new(4, 5, 6)]).expect("second write");

        assert_eq!(read_results(&path).expect("read"), vec![MonumentResult::new(4, 5, 6)]);
        let names: Vec<_> = fs::read_dir(dir.path())
            .expect("list")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(MERGED_FILE)]);
    }

    #[test]
    fn failed_write_keeps_the_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ResultStore::new(dir.path());
        let path = store.partial_path(0);
        write_results(&path, &[MonumentResult::new(200, 296, 3)]).expect("write");

        let failed = write_rows(&path, RESULT_HEADER, &[MonumentResult::new(8, 8, 1)], |_, _| {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });

        assert!(matches!(failed, Err(PipelineError::Io { .. })));
        assert_eq!(
            read_results(&path).expect("read"),
            vec![MonumentResult::new(200, 296, 3)]
        );
        assert_eq!(store.partial_files().expect("list"), vec![path]);
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }

    #[test]
    fn clearing_removes_only_intermediates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ResultStore::new(dir.path());
        for path in [
            store.candidates_path().to_path_buf(),
            store.partial_path(0),
            store.partial_path(5),
            store.merged_path(),
        ] {
            fs::write(&path, "").expect("write");
        }

        assert_eq!(store.clear_intermediates().expect("clear"), 3);
        assert!(store.merged_path().exists());
        assert!(store.partial_files().expect("list").is_empty());
    }
}
