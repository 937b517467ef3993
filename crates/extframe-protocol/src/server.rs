use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use extframe_store::{PartitionSink, PartitionSource};
use extframe_transport::{Connection, TcpTransport};
use extframe_wire::{WireConfig, WireReader, WireWriter};
use tracing::{debug, info, info_span, warn};

use crate::dispatch::{dispatch, Outcome};
use crate::error::Result;

/// Server behavior knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Codec limits and per-connection socket timeouts.
    pub wire: WireConfig,
    /// Expect two reserved bytes before the request type.
    pub legacy_envelope: bool,
    /// Disable Nagle's algorithm on accepted connections.
    pub nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            wire: WireConfig::default(),
            legacy_envelope: false,
            nodelay: true,
        }
    }
}

/// Accepts connections and serves one request per connection against a
/// shared store.
pub struct Server<S: ?Sized> {
    transport: TcpTransport,
    config: ServerConfig,
    store: Arc<S>,
    next_conn_id: AtomicU64,
    shutdown: Arc<AtomicBool>,
}

impl<S> Server<S>
where
    S: PartitionSink + PartitionSource + ?Sized + 'static,
{
    /// Bind with the default configuration.
    pub fn bind(addr: impl ToSocketAddrs, store: Arc<S>) -> Result<Self> {
        Self::bind_with_config(addr, ServerConfig::default(), store)
    }

    pub fn bind_with_config(
        addr: impl ToSocketAddrs,
        config: ServerConfig,
        store: Arc<S>,
    ) -> Result<Self> {
        let transport = TcpTransport::bind(addr)?;
        Ok(Self {
            transport,
            config,
            store,
            next_conn_id: AtomicU64::new(1),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle that stops [`Server::serve`] from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.local_addr(),
        }
    }

    /// Accept one connection and serve it on the calling thread.
    pub fn serve_one(&self) -> Result<Outcome> {
        let conn = self.transport.accept()?;
        let id = self.next_id();
        serve_connection(&id, conn, &self.config, self.store.as_ref())
    }

    /// Accept connections until shut down, one thread per connection.
    ///
    /// Returns after in-flight connections have finished.
    pub fn serve(&self) -> Result<()> {
        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        info!(addr = %self.local_addr(), "serving");

        loop {
            let accepted = self.transport.accept();
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            let conn = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let id = self.next_id();
            let store = Arc::clone(&self.store);
            let config = self.config.clone();
            let spawned = thread::Builder::new()
                .name(id.clone())
                .spawn(move || {
                    let _ = serve_connection(&id, conn, &config, store.as_ref());
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => warn!(error = %e, "failed to spawn connection thread"),
            }
            reap_finished(&mut workers);
        }

        debug!(in_flight = workers.len(), "draining connections");
        for worker in workers {
            join_worker(worker);
        }
        info!("server stopped");
        Ok(())
    }

    fn next_id(&self) -> String {
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        format!("conn-{id}")
    }
}

/// Join finished connection threads, logging any that panicked.
fn reap_finished(workers: &mut Vec<JoinHandle<()>>) {
    let (finished, running): (Vec<_>, Vec<_>) =
        workers.drain(..).partition(JoinHandle::is_finished);
    *workers = running;
    for worker in finished {
        join_worker(worker);
    }
}

fn join_worker(worker: JoinHandle<()>) {
    let id = worker.thread().name().unwrap_or("unnamed").to_string();
    if worker.join().is_err() {
        warn!(id = %id, "connection thread panicked");
    }
}

/// Stops a running [`Server::serve`] loop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Set the stop flag and wake the blocked accept.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = TcpTransport::connect(self.addr) {
            debug!(error = %e, "shutdown wake-up connect failed");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Serve a single accepted connection and close it.
///
/// Errors are logged here; the connection is closed either way.
pub fn serve_connection<S>(
    id: &str,
    conn: Connection,
    config: &ServerConfig,
    store: &S,
) -> Result<Outcome>
where
    S: PartitionSink + PartitionSource + ?Sized,
{
    let peer = conn
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let span = info_span!("connection", id, %peer);
    let _enter = span.enter();

    let result = run_connection(conn, config, store);
    match &result {
        Ok(Outcome::Ingested(s)) => info!(
            dataset = %s.dataset,
            partition = s.partition,
            rows = s.rows,
            "ingest complete"
        ),
        Ok(Outcome::Exported(s)) => info!(
            dataset = %s.dataset,
            partition = s.partition,
            rows = s.rows,
            cells = s.cells,
            "export complete"
        ),
        Err(e) => warn!(kind = ?e.kind(), error = %e, "connection aborted"),
    }
    result
}

fn run_connection<S>(conn: Connection, config: &ServerConfig, store: &S) -> Result<Outcome>
where
    S: PartitionSink + PartitionSource + ?Sized,
{
    conn.set_nodelay(config.nodelay)?;
    let reader_conn = conn.try_clone()?;
    let mut reader = WireReader::with_config_conn(reader_conn, config.wire.clone())?;
    let mut writer = WireWriter::with_config_conn(conn, config.wire.clone())?;

    let result = dispatch(&mut reader, &mut writer, store, config.legacy_envelope);

    if let Err(e) = writer.get_ref().shutdown() {
        debug!(error = %e, "shutdown failed");
    }
    result
}
