#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Resumable three-phase batch pipeline.
//!
//! `discover` predicts and filters candidates, `analyze` classifies one
//! explicit window of them, and `merge` folds the partial results into a
//! single sorted file. Each phase is meant to run in its own short-lived
//! process; nothing is carried between phases except the files managed by
//! [`ResultStore`].

mod store;

use std::{
    collections::BTreeMap,
    fmt::Display,
    io,
    path::{Path, PathBuf},
};

use monument_survey_core::{
    BatchRange, BiomeSampler, ChunkCoord, MonumentResult, ProcessControl, RoomClassification,
    WorldAccess,
};
use monument_survey_system_environment::EnvironmentFilter;
use monument_survey_system_layout::LayoutIntrospector;
use monument_survey_system_placement::{PlacementError, PlacementPredictor, SearchArea};
use thiserror::Error;
use tracing::{error, info, warn};

pub use store::{
    read_candidates, read_results, write_candidates, write_results, ResultStore,
    CANDIDATES_FILE, CANDIDATE_HEADER, MERGED_FILE, RESULT_HEADER,
};

/// Exit code requested when a phase fails fatally.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Fatal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Parameters were rejected before any file was touched.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// `analyze` was pointed at a candidate file that does not exist.
    #[error("candidate file {} does not exist", .0.display())]
    CandidateSourceMissing(PathBuf),
    /// Reading or writing a pipeline file failed.
    #[error("i/o failure on {}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// A CSV row could not be parsed.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        /// File holding the row.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },
}

impl PipelineError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<PlacementError> for PipelineError {
    fn from(err: PlacementError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Search parameters of the discover phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscoverRequest {
    /// World seed.
    pub seed: i64,
    /// Square window searched around its centre.
    pub area: SearchArea,
    /// Maximum number of candidates written; must be positive.
    pub max_results: usize,
}

/// Predicts candidate origins, filters them by environment, and writes the
/// survivors to the store's candidate file.
///
/// Any candidate or partial files left by a previous run are deleted first.
pub fn discover<S>(
    request: DiscoverRequest,
    predictor: &PlacementPredictor,
    filter: &EnvironmentFilter<'_, S>,
    store: &ResultStore,
) -> Result<Vec<ChunkCoord>, PipelineError>
where
    S: BiomeSampler,
{
    if request.max_results == 0 {
        return Err(PipelineError::Configuration(
            "max results must be positive".to_owned(),
        ));
    }

    let removed = store.clear_intermediates()?;
    if removed > 0 {
        info!(removed, "deleted stale candidate and partial files");
    }

    let candidates = predictor.predict_refined(
        request.seed,
        request.area,
        request.max_results,
        |chunk| filter.refine(chunk),
    );
    write_candidates(store.candidates_path(), &candidates)?;
    info!(
        seed = request.seed,
        center_x = request.area.center().x(),
        center_z = request.area.center().z(),
        radius = request.area.radius(),
        candidates = candidates.len(),
        path = %store.candidates_path().display(),
        "wrote candidates"
    );
    Ok(candidates)
}

/// Result of a single analyze invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// The batch start lies past the end of the candidate list; nothing ran.
    OutOfRange {
        /// Requested first index.
        start: usize,
        /// Number of candidates available.
        candidates: usize,
    },
    /// The batch was classified and its partial file written.
    Completed {
        /// Partial result file written for the batch.
        path: PathBuf,
        /// Confirmed instances in candidate order.
        results: Vec<MonumentResult>,
        /// Candidates that turned out not to host an instance.
        absent: usize,
    },
}

/// Classifies one window of candidates and writes its partial result file.
///
/// The phase owns `world` and drops it on return, releasing every cache the
/// host session built up. Re-running the same batch start overwrites the
/// previous partial file.
pub fn analyze<W>(
    store: &ResultStore,
    batch: BatchRange,
    mut world: W,
    introspector: &LayoutIntrospector,
) -> Result<AnalyzeOutcome, PipelineError>
where
    W: WorldAccess,
{
    if batch.size() == 0 {
        return Err(PipelineError::Configuration(
            "batch size must be positive".to_owned(),
        ));
    }
    let source = store.candidates_path();
    if !source.exists() {
        return Err(PipelineError::CandidateSourceMissing(source.to_path_buf()));
    }

    let candidates = read_candidates(source)?;
    let Some(window) = batch.resolve(candidates.len()) else {
        warn!(
            start = batch.start(),
            candidates = candidates.len(),
            "batch start out of range; nothing to analyze"
        );
        return Ok(AnalyzeOutcome::OutOfRange {
            start: batch.start(),
            candidates: candidates.len(),
        });
    };

    info!(
        start = window.start,
        end = window.end,
        total = candidates.len(),
        "analyzing batch"
    );
    let mut results = Vec::with_capacity(window.len());
    let mut absent = 0;
    for (index, chunk) in candidates[window.clone()].iter().enumerate() {
        let classification = introspector.classify(&mut world, *chunk);
        match classification {
            RoomClassification::Rooms(rooms) => {
                let result = MonumentResult::at_chunk(*chunk, rooms);
                info!(
                    idx = window.start + index,
                    x = result.x(),
                    z = result.z(),
                    rooms,
                    "confirmed instance"
                );
                results.push(result);
            }
            RoomClassification::Absent => {
                absent += 1;
                warn!(
                    idx = window.start + index,
                    chunk_x = chunk.x(),
                    chunk_z = chunk.z(),
                    rooms = classification.sentinel(),
                    "no valid instance"
                );
            }
        }
    }

    let path = store.partial_path(batch.start());
    write_results(&path, &results)?;
    info!(
        confirmed = results.len(),
        absent,
        path = %path.display(),
        "wrote partial results"
    );
    Ok(AnalyzeOutcome::Completed {
        path,
        results,
        absent,
    })
}

/// Constants converting room counts into an aggregate yield estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YieldModel {
    /// Yield attributed to each special room.
    pub per_room: f64,
    /// Fixed yield attributed to every instance.
    pub per_instance: f64,
}

impl Default for YieldModel {
    fn default() -> Self {
        Self {
            per_room: 30.0,
            per_instance: 3.0,
        }
    }
}

impl YieldModel {
    /// `Σ rooms · per_room + instances · per_instance`.
    #[must_use]
    pub fn estimate(&self, results: &[MonumentResult]) -> f64 {
        let rooms: u64 = results.iter().map(|r| u64::from(r.rooms())).sum();
        rooms as f64 * self.per_room + results.len() as f64 * self.per_instance
    }
}

/// Summary of a completed merge.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeSummary {
    /// Merged result file.
    pub path: PathBuf,
    /// Every merged row in canonical order.
    pub results: Vec<MonumentResult>,
    /// Number of instances per room count.
    pub distribution: BTreeMap<u32, usize>,
    /// Aggregate yield estimate.
    pub estimated_yield: f64,
}

/// Folds every partial result file into the merged file.
///
/// Returns `None`, leaving any existing merged file untouched, when no
/// partial files are present. Otherwise the intermediate files are deleted
/// once the merged file is written.
pub fn merge(
    store: &ResultStore,
    yield_model: YieldModel,
) -> Result<Option<MergeSummary>, PipelineError> {
    let partials = store.partial_files()?;
    if partials.is_empty() {
        warn!(dir = %store.dir().display(), "no partial result files found");
        return Ok(None);
    }

    let mut results = Vec::new();
    for partial in &partials {
        results.extend(read_results(partial)?);
    }
    results.sort_by(MonumentResult::canonical_cmp);

    let path = store.merged_path();
    write_results(&path, &results)?;
    let removed = store.clear_intermediates()?;
    info!(
        partials = partials.len(),
        rows = results.len(),
        removed,
        path = %path.display(),
        "merged partial results"
    );

    let mut distribution = BTreeMap::new();
    for result in &results {
        *distribution.entry(result.rooms()).or_insert(0) += 1;
    }
    for (rooms, instances) in distribution.iter().rev() {
        info!(rooms, instances, "room count distribution");
    }
    let estimated_yield = yield_model.estimate(&results);
    info!(
        instances = results.len(),
        estimated_yield,
        per_room = yield_model.per_room,
        per_instance = yield_model.per_instance,
        "aggregate yield"
    );

    Ok(Some(MergeSummary {
        path,
        results,
        distribution,
        estimated_yield,
    }))
}

/// Runs a phase body and reports its fate to the process control capability.
///
/// Success requests a graceful stop; failure requests a forced halt with
/// [`FATAL_EXIT_CODE`]. The result is returned unchanged either way.
pub fn run_phase<C, T, E, F>(control: &mut C, phase: &str, body: F) -> Result<T, E>
where
    C: ProcessControl,
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    let outcome = body();
    match &outcome {
        Ok(_) => {
            info!(phase, "phase complete");
            control.request_graceful_stop();
        }
        Err(err) => {
            error!(phase, error = %describe_failure(err), "phase failed");
            control.force_halt(FATAL_EXIT_CODE);
        }
    }
    outcome
}

/// Renders an error with its full cause chain when the type supports the
/// alternate form, as `anyhow::Error` does.
fn describe_failure<E: Display>(err: &E) -> String {
    format!("{err:#}")
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Default)]
    struct RecordingControl {
        stops: usize,
        halts: Vec<i32>,
    }

    impl ProcessControl for RecordingControl {
        fn request_graceful_stop(&mut self) {
            self.stops += 1;
        }

        fn force_halt(&mut self, exit_code: i32) {
            self.halts.push(exit_code);
        }
    }

    #[test]
    fn successful_phase_requests_graceful_stop() {
        let mut control = RecordingControl::default();
        let value: Result<u32, PipelineError> = run_phase(&mut control, "merge", || Ok(7));
        assert_eq!(value.ok(), Some(7));
        assert_eq!(control.stops, 1);
        assert!(control.halts.is_empty());
    }

    #[test]
    fn failed_phase_forces_halt() {
        let mut control = RecordingControl::default();
        let value: Result<(), PipelineError> = run_phase(&mut control, "analyze", || {
            Err(PipelineError::CandidateSourceMissing(PathBuf::from("missing.csv")))
        });
        assert!(value.is_err());
        assert_eq!(control.stops, 0);
        assert_eq!(control.halts, vec![FATAL_EXIT_CODE]);
    }

    struct Chained;

    impl Display for Chained {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            if f.alternate() {
                write!(f, "invalid placement configuration: spacing 0 must be positive")
            } else {
                write!(f, "invalid placement configuration")
            }
        }
    }

    #[test]
    fn failure_description_keeps_the_cause_chain() {
        assert_eq!(
            describe_failure(&Chained),
            "invalid placement configuration: spacing 0 must be positive"
        );
        let mut control = RecordingControl::default();
        let value: Result<(), Chained> = run_phase(&mut control, "discover", || Err(Chained));
        assert!(value.is_err());
        assert_eq!(control.halts, vec![FATAL_EXIT_CODE]);
    }

    #[test]
    fn yield_sums_rooms_and_instances() {
        let results = [
            MonumentResult::new(0, 0, 3),
            MonumentResult::new(0, 0, 0),
            MonumentResult::new(0, 0, 2),
        ];
        let estimate = YieldModel::default().estimate(&results);
        assert!((estimate - (5.0 * 30.0 + 3.0 * 3.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn placement_errors_become_configuration_errors() {
        let err = PipelineError::from(PlacementError::InvalidSpread {
            spacing: 5,
            separation: 5,
        });
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
