//! Data connection negotiation.
//!
//! PASV binds a listener on the control connection's local address; PORT records a client
//! endpoint. Either way the next transfer command consumes the descriptor and gets exactly
//! one connected stream out of it.

use crate::code::{FtpResponse, Port};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

pub type DataStream = Compat<TcpStream>;

#[derive(Debug, Error)]
pub enum DataChanError {
    #[error("passive mode needs an IPv4 control connection, got {0}")]
    NotIpv4(IpAddr),
    #[error("failed to bind passive listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("failed to accept passive data connection: {0}")]
    Accept(#[source] std::io::Error),
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },
}

/// The single live data-channel descriptor of a session.
#[derive(Debug)]
pub enum DataChannel {
    /// PORT: the server connects out to the client.
    Active(SocketAddrV4),
    /// PASV: the client connects in to the server.
    Passive(PassiveListener),
}

impl DataChannel {
    /// Turns the descriptor into a connected stream, waiting for the peer as long as it
    /// takes. The descriptor is consumed; a passive listener is closed once it has
    /// accepted.
    pub async fn open(self) -> Result<DataStream, DataChanError> {
        match self {
            DataChannel::Active(addr) => {
                tracing::debug!(%addr, "connecting active data channel");
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|source| DataChanError::Connect { addr, source })?;
                Ok(stream.compat())
            }
            DataChannel::Passive(listener) => listener.accept().await,
        }
    }
}

#[derive(Debug)]
pub struct PassiveListener {
    listener: TcpListener,
    addr: SocketAddrV4,
}

impl PassiveListener {
    /// Binds an ephemeral port on `control_local`, the address the client reached the
    /// control connection on.
    pub async fn bind(control_local: IpAddr) -> Result<Self, DataChanError> {
        let ip = ipv4_of(control_local).ok_or(DataChanError::NotIpv4(control_local))?;

        let listener = TcpListener::bind((ip, 0))
            .await
            .map_err(DataChanError::Bind)?;

        let addr = match listener.local_addr().map_err(DataChanError::Bind)? {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(addr) => SocketAddrV4::new(ip, addr.port()),
        };

        tracing::info!("listening for passive connection on {}", addr);
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddrV4 {
        self.addr
    }

    pub fn to_reply(&self) -> FtpResponse {
        FtpResponse::EnteringPassiveMode(*self.addr.ip(), Port(self.addr.port()))
    }

    async fn accept(self) -> Result<DataStream, DataChanError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(DataChanError::Accept)?;
        tracing::debug!(%peer, "accepted passive data connection");
        Ok(stream.compat())
    }
}

fn ipv4_of(ip: IpAddr) -> Option<Ipv4Addr> {
    match ip {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{AsyncReadExt, AsyncWriteExt};
    use std::net::Ipv6Addr;

    #[tokio::test]
    async fn passive_reply_advertises_bound_port() {
        let listener = PassiveListener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .await
            .unwrap();
        let addr = listener.local_addr();
        assert_ne!(addr.port(), 0);
        assert_eq!(
            listener.to_reply(),
            FtpResponse::EnteringPassiveMode(Ipv4Addr::LOCALHOST, Port(addr.port()))
        );
    }

    #[tokio::test]
    async fn ipv4_mapped_control_address_binds_ipv4() {
        let mapped = IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped());
        let listener = PassiveListener::bind(mapped).await.unwrap();
        assert_eq!(*listener.local_addr().ip(), Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    async fn pure_ipv6_is_refused() {
        let err = PassiveListener::bind(IpAddr::V6(Ipv6Addr::LOCALHOST))
            .await
            .unwrap_err();
        assert!(matches!(err, DataChanError::NotIpv4(_)));
    }

    #[tokio::test]
    async fn passive_channel_accepts_one_peer() {
        let listener = PassiveListener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .await
            .unwrap();
        let addr = listener.local_addr();

        let client = tokio::spawn(async move {
            let mut peer = TcpStream::connect(addr).await.unwrap().compat();
            peer.write_all(b"ping").await.unwrap();
        });

        let mut stream = DataChannel::Passive(listener).open().await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"ping");
        client.await.unwrap();
    }

    #[tokio::test]
    async fn active_channel_connects_to_recorded_endpoint() {
        let server = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let SocketAddr::V4(addr) = server.local_addr().unwrap() else {
            unreachable!();
        };

        let accept = tokio::spawn(async move { server.accept().await.map(|(_, peer)| peer) });
        DataChannel::Active(addr).open().await.unwrap();
        assert!(accept.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn active_channel_reports_refused_connection() {
        // bind then drop to get a port nothing listens on
        let port = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = DataChannel::Active(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
            .open()
            .await
            .unwrap_err();
        assert!(matches!(err, DataChanError::Connect { .. }));
    }
}
