//! The build task graph: an explicit tree of sequence and parallel nodes
//! over step identifiers.
//!
//! Sequence nodes run children in order and abort on the first failure.
//! Parallel nodes run children concurrently on the rayon pool, always wait
//! for every child, and collect ALL failures rather than the first one.

use rayon::prelude::*;

use crate::step::{Pipeline, StepError, StepId, StepReport};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Step(StepId),
    Sequence(Vec<Node>),
    Parallel(Vec<Node>),
}

pub fn step(id: StepId) -> Node {
    Node::Step(id)
}

pub fn sequence(children: Vec<Node>) -> Node {
    Node::Sequence(children)
}

pub fn parallel(children: Vec<Node>) -> Node {
    Node::Parallel(children)
}

/// The full build: clean first, then the independent asset steps
/// concurrently, then styles last.
pub fn build_graph() -> Node {
    sequence(vec![
        step(StepId::Clean),
        parallel(vec![
            step(StepId::Pages),
            step(StepId::Scripts),
            step(StepId::Images),
            step(StepId::Copy),
        ]),
        step(StepId::Styles),
    ])
}

/// One or more step failures from a graph run, in graph order.
#[derive(Debug)]
pub struct BuildError {
    pub failures: Vec<(StepId, StepError)>,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.len() == 1 {
            let (id, err) = &self.failures[0];
            return write!(f, "step `{id}` failed: {err}");
        }
        writeln!(f, "{} steps failed:", self.failures.len())?;
        for (id, err) in &self.failures {
            writeln!(f, "  {id}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildError {}

/// Run a graph against the pipeline's step runners.
pub fn run(node: &Node, pipeline: &Pipeline) -> Result<(), BuildError> {
    run_with(node, &|id| pipeline.run_step(id))
}

/// Run a graph with an arbitrary step executor. The executor must be
/// `Sync` so parallel nodes can call it from worker threads.
pub fn run_with<F>(node: &Node, exec: &F) -> Result<(), BuildError>
where
    F: Fn(StepId) -> Result<StepReport, StepError> + Sync,
{
    match node {
        Node::Step(id) => exec(*id).map(|_| ()).map_err(|e| BuildError {
            failures: vec![(*id, e)],
        }),
        Node::Sequence(children) => {
            for child in children {
                run_with(child, exec)?;
            }
            Ok(())
        }
        Node::Parallel(children) => {
            let failures: Vec<(StepId, StepError)> = children
                .par_iter()
                .filter_map(|child| run_with(child, exec).err())
                .flat_map(|e| e.failures)
                .collect();
            if failures.is_empty() {
                Ok(())
            } else {
                Err(BuildError { failures })
            }
        }
    }
}
