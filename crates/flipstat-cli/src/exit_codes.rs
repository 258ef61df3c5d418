//! Exit codes shared by the flipstat binaries.
//! Scripts may branch on these; keep them stable.

pub const SUCCESS: i32 = 0;
pub const INPUT_ERROR: i32 = 2; // Missing input file or invalid flipstat.yaml
pub const DATA_ERROR: i32 = 3; // Schema, duplicate pivot key or malformed csv
pub const OUTPUT_ERROR: i32 = 4; // Could not write a csv/report/chart

/// Maps a failed run to its exit code.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<flipstat_core::FlipstatError>() {
        Some(e) => e.exit_code(),
        None => INPUT_ERROR,
    }
}
