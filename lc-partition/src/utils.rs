//! Utility functions for persisting run artefacts.

use std::fmt::Display;
use std::fs::{
    self,
    File,
};
use std::io::{
    BufWriter,
    ErrorKind,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    Context,
    Result,
};
use chrono::{
    DateTime,
    Utc,
};
use petgraph::dot::Dot;
use petgraph::graph::Graph;
use petgraph::EdgeType;
use serde::Serialize;
use tracing::{
    debug,
    instrument,
};

/// Provenance written next to every run's artefacts.
#[derive(Debug, Serialize)]
struct RunMetadata {
    timestamp: String,
    package: &'static str,
    version: &'static str,
    command_args: Vec<String>,
}

/// Create a fresh run directory under `base_dir`, named after the current UTC time, and record
/// the run's provenance in `metadata.json`.
///
/// Runs started within the same millisecond get a numeric suffix instead of sharing a directory.
#[instrument]
pub fn create_timestamped_output_dir(base_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(base_dir).with_context(|| format!("creating {}", base_dir.display()))?;

    let started: DateTime<Utc> = Utc::now();
    let stamp = started.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string();
    let mut run_dir = base_dir.join(&stamp);
    let mut attempt = 0;
    loop {
        match fs::create_dir(&run_dir) {
            Ok(()) => break,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                attempt += 1;
                run_dir = base_dir.join(format!("{stamp}-{attempt}"));
            },
            Err(err) => return Err(err).with_context(|| format!("creating {}", run_dir.display())),
        }
    }
    debug!(run_dir = %run_dir.display(), "Created run directory");

    let metadata = RunMetadata {
        timestamp: started.to_rfc3339(),
        package: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        command_args: std::env::args().collect(),
    };
    write_json_file(&run_dir, "metadata.json", &metadata)?;

    Ok(run_dir)
}

/// Write a lane network as a DOT file within `output_dir`; node labels are junction ids, edge
/// labels lane ids.
#[instrument(skip(graph))]
pub fn write_dot_file<N, E, Ty>(output_dir: &Path, filename: &str, graph: &Graph<N, E, Ty>) -> Result<PathBuf>
where
    N: Display,
    E: Display,
    Ty: EdgeType,
{
    let file_path = output_dir.join(filename);
    let mut file = File::create(&file_path).with_context(|| format!("creating {}", file_path.display()))?;
    writeln!(file, "{}", Dot::new(graph))?;

    debug!("Graph written to: {}", file_path.display());
    Ok(file_path)
}

/// Serialise `value` as pretty JSON into `output_dir/filename`.
pub fn write_json_file<T: Serialize + ?Sized>(output_dir: &Path, filename: &str, value: &T) -> Result<PathBuf> {
    let file_path = output_dir.join(filename);
    let mut writer = BufWriter::new(File::create(&file_path).with_context(|| format!("creating {}", file_path.display()))?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    debug!("JSON written to: {}", file_path.display());
    Ok(file_path)
}
