//! The `dev` command: build, serve, watch, reload.
//!
//! Startup order matters: the watcher registers BEFORE the initial build
//! so edits made while it runs are picked up, and the initial build is
//! fatal on failure since serving a half-built dist would mislead.

use std::net::IpAddr;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::config::Config;
use crate::core::Mode;
use crate::serve::{DEFAULT_WS_PORT, DevServer, start_reload_hub};
use crate::step::Pipeline;
use crate::watch::WatchCoordinator;
use crate::{graph, log};

pub fn dev_site(
    mut config: Config,
    mode: Mode,
    interface: Option<IpAddr>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(interface) = interface {
        config.serve.interface = interface;
    }
    if let Some(port) = port {
        config.serve.port = port;
    }

    let config = Arc::new(config);
    let pipeline = Arc::new(Pipeline::new((*config).clone(), mode));

    let reload = start_reload_hub(config.serve.interface, DEFAULT_WS_PORT)?;
    let coordinator = WatchCoordinator::start(Arc::clone(&pipeline), reload)?;

    let started = Instant::now();
    log!("build"; "building for {}", mode.label());
    graph::run(&graph::build_graph(), &pipeline)?;
    log!("build"; "finished in {:.2?}", started.elapsed());

    let server = DevServer::bind(Arc::clone(&config), DEFAULT_WS_PORT)?;

    thread::spawn(move || coordinator.run());

    // Blocks until Ctrl-C unblocks the accept loop
    server.run();
    log!("serve"; "shutting down");
    Ok(())
}
