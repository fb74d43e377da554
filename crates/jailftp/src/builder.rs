use crate::{CredentialStore, Ftp};
use futures::{AsyncRead, AsyncWrite};
use std::net::IpAddr;

pub const DEFAULT_WELCOME: &str = "jailftp ready";

pub struct FtpBuilder {
    pub(crate) welcome: String,
}

impl Default for FtpBuilder {
    fn default() -> Self {
        Self {
            welcome: DEFAULT_WELCOME.to_string(),
        }
    }
}

impl FtpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the 220 greeting sent when the connection opens.
    pub fn welcome(mut self, welcome: impl Into<String>) -> Self {
        self.welcome = welcome.into();
        self
    }

    pub fn build<Store, Stream>(
        self,
        store: Store,
        stream: Stream,
        local_ip: IpAddr,
    ) -> Ftp<Store, Stream>
    where
        Store: CredentialStore,
        Stream: AsyncRead + AsyncWrite + Unpin + Send,
    {
        Ftp::from_builder(self, store, stream, local_ip)
    }
}
