use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{describe, Result, TransportError};
use crate::stream::Connection;

/// TCP transport.
///
/// Binds a listening socket and hands out [`Connection`]s, one per accepted
/// client. Client code uses [`TcpTransport::connect`].
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on the given address. Port `0` picks an ephemeral port.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let addrs = resolve(addr)?;
        let listener = TcpListener::bind(&addrs[..]).map_err(|e| TransportError::Bind {
            addr: describe(&addrs),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: describe(&addrs),
            source: e,
        })?;

        info!(%local_addr, "listening on tcp");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Connection> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(Connection::from_tcp(stream))
    }

    /// Connect to a listening endpoint (blocking).
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Connection> {
        let addrs = resolve(addr)?;
        let stream = TcpStream::connect(&addrs[..]).map_err(|e| TransportError::Connect {
            addr: describe(&addrs),
            source: e,
        })?;
        debug!(addr = %describe(&addrs), "connected");
        Ok(Connection::from_tcp(stream))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

fn resolve(addr: impl ToSocketAddrs) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(TransportError::Unresolved("<empty>".to_string()));
    }
    Ok(addrs)
}
