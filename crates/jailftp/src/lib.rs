//! jailftp is a small FTP server engine that confines every session to a directory jail.
//!
//! The engine speaks the control protocol over any `futures` byte stream; data connections
//! (PORT and PASV) use Tokio TCP sockets. Who may log in, and where they are jailed, comes
//! from a [`CredentialStore`] supplied by the embedding server.

pub mod code;
pub mod command;
pub mod datachan;
pub mod listing;
pub mod path;
pub mod session;
pub mod transfer;

mod builder;
mod credentials;
mod ftp;

pub use builder::*;
pub use credentials::*;
pub use ftp::*;

pub mod io {
    pub use futures::io::{AsyncRead, AsyncWrite};

    pub use tokio_util::compat::{
        Compat, FuturesAsyncReadCompatExt, FuturesAsyncWriteCompatExt, TokioAsyncReadCompatExt,
        TokioAsyncWriteCompatExt,
    };
}
