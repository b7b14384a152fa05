//! The `clean` step: reset the dist directory.
//!
//! Exactly one clean execution precedes any full build (it is the first
//! element of the build sequence), so dist never holds stale output from a
//! previous configuration.

use std::fs;
use std::io;

use super::{Pipeline, StepError, StepId, StepReport, StepRunner};

pub struct CleanStep;

impl StepRunner for CleanStep {
    fn id(&self) -> StepId {
        StepId::Clean
    }

    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError> {
        let dist = &pipeline.config.dist;

        match fs::remove_dir_all(dist) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StepError::io(dist, e)),
        }
        fs::create_dir_all(dist).map_err(|e| StepError::io(dist, e))?;

        Ok(StepReport::default())
    }
}
