//! WebSocket hub for live reload.
//!
//! Browsers connect via the injected client script; the watch coordinator
//! sends a notification after a successful rebuild and every connected
//! socket receives a `reload` text message. Sockets that fail the send
//! (closed tab, navigated away) are pruned from the hub.

use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crossbeam::channel;
use parking_lot::Mutex;
use tungstenite::WebSocket;

use super::ServerError;
use crate::{debug, log};

/// Default WebSocket port for live reload.
pub const DEFAULT_WS_PORT: u16 = 35729;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Cloneable sender half handed to the watch coordinator.
#[derive(Clone, Debug)]
pub struct ReloadHandle {
    tx: channel::Sender<()>,
}

impl ReloadHandle {
    /// Ask every connected browser to reload. Never blocks; if the hub is
    /// gone the notification is dropped.
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }
}

/// Bind the hub and spawn its accept and broadcast threads.
///
/// The hub listens on the same interface as the HTTP server, so browsers
/// on other machines can reach it when serving on 0.0.0.0. The port is
/// fixed: browsers resolve it from the injected script, so falling back
/// to another port would leave clients dialing the wrong one.
pub fn start(interface: IpAddr, port: u16) -> Result<ReloadHandle, ServerError> {
    let addr = SocketAddr::new(interface, port);
    let listener = TcpListener::bind(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_string(),
        message: e.to_string(),
    })?;

    let clients: Clients = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = channel::unbounded::<()>();

    spawn_acceptor(listener, Arc::clone(&clients));
    spawn_broadcaster(rx, clients);

    debug!("reload"; "ws://{addr}");
    Ok(ReloadHandle { tx })
}

fn spawn_acceptor(listener: TcpListener, clients: Clients) {
    thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    log!("reload"; "accept error: {e}");
                    continue;
                }
            };

            match tungstenite::accept(stream) {
                Ok(socket) => {
                    debug!("reload"; "client connected");
                    clients.lock().push(socket);
                }
                Err(e) => debug!("reload"; "handshake failed: {e}"),
            }
        }
    });
}

fn spawn_broadcaster(rx: channel::Receiver<()>, clients: Clients) {
    thread::spawn(move || {
        while rx.recv().is_ok() {
            // Coalesce bursts into one reload
            while rx.try_recv().is_ok() {}

            let mut clients = clients.lock();
            let before = clients.len();
            clients.retain_mut(|socket| socket.send("reload".into()).is_ok());
            if clients.len() < before {
                debug!("reload"; "pruned {} dead clients", before - clients.len());
            }
            if !clients.is_empty() {
                debug!("reload"; "notified {} clients", clients.len());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_hub_binds_the_given_interface() {
        let port = free_port();
        let _handle = start(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port).unwrap();

        // Bound on 0.0.0.0, so loopback connections must reach it
        assert!(TcpStream::connect(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn test_hub_port_already_in_use_is_bind_error() {
        let guard = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = guard.local_addr().unwrap().port();

        let err = start(IpAddr::V4(Ipv4Addr::LOCALHOST), port).unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
