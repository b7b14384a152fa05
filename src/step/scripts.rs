//! The `scripts` step: bundle each entry point with the external bundler.
//!
//! Module-graph resolution belongs entirely to the tool (esbuild by
//! default); this runner only locates the executable, shells out once per
//! entry, and maps a non-zero exit status to a `StepError` carrying the
//! tool's own diagnostics.

use std::path::Path;
use std::process::{Command, Stdio};

use super::{Pipeline, StepError, StepId, StepReport, StepRunner};
use crate::core::Mode;

pub struct ScriptsStep;

impl StepRunner for ScriptsStep {
    fn id(&self) -> StepId {
        StepId::Scripts
    }

    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError> {
        let config = &pipeline.config;
        let bundler = which::which(&config.scripts.bundler)
            .map_err(|_| StepError::ToolMissing(config.scripts.bundler.clone()))?;

        let dest = config.dist.join(&config.scripts.dest);
        std::fs::create_dir_all(&dest).map_err(|e| StepError::io(&dest, e))?;

        let mut written = 0;
        for entry in &config.scripts.entries {
            bundle_entry(&bundler, entry, &dest, pipeline.mode)?;
            written += 1;
        }

        Ok(StepReport::new(written))
    }
}

fn bundle_entry(
    bundler: &Path,
    entry: &Path,
    dest: &Path,
    mode: Mode,
) -> Result<(), StepError> {
    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bundle");
    let outfile = dest.join(format!("{stem}.js"));

    let mut cmd = Command::new(bundler);
    cmd.arg(entry)
        .arg("--bundle")
        .arg(format!("--outfile={}", outfile.display()));
    match mode {
        Mode::Production => cmd.arg("--minify"),
        Mode::Development => cmd.arg("--sourcemap"),
    };

    let output = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| StepError::io(entry, e))?;

    if !output.status.success() {
        return Err(StepError::Bundler {
            entry: entry.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}
