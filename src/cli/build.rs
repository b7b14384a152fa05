//! The `build` command: run the task graph once.

use std::time::Instant;

use crate::config::Config;
use crate::core::Mode;
use crate::graph;
use crate::log;
use crate::step::Pipeline;

pub fn build_site(config: Config, mode: Mode) -> anyhow::Result<()> {
    let started = Instant::now();
    log!("build"; "building for {}", mode.label());

    let pipeline = Pipeline::new(config, mode);
    graph::run(&graph::build_graph(), &pipeline)?;

    log!("build"; "finished in {:.2?}", started.elapsed());
    Ok(())
}
