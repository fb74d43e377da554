use crate::{
    CredentialStore, FtpBuilder,
    code::{FtpResponse, IntoFtpResponse, SimpleReturnCode},
    command::{
        Command, ParseError,
        mode::TransferMode,
        r#type::{FormatControl, Type},
        stru::FileStructure,
        verb_allowed_before_login,
    },
    datachan::{DataChanError, DataChannel, PassiveListener},
    session::{LoginState, Session},
    transfer::PendingTransfer,
};
use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use std::{net::IpAddr, path::PathBuf};
use thiserror::Error;

/// Longest command line accepted before the session is dropped.
pub const MAX_LINE_LEN: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Read(#[from] ReadError),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command line exceeds {MAX_LINE_LEN} bytes")]
    LineTooLong,
}

/// The protocol engine for one control connection.
pub struct Ftp<Store, Stream>
where
    Store: CredentialStore,
    Stream: AsyncRead + AsyncWrite + Unpin,
{
    store: Store,
    stream: Stream,
    local_ip: IpAddr,
    welcome: String,
    session: Session,
}

impl<Store, Stream> Ftp<Store, Stream>
where
    Store: CredentialStore,
    Stream: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// `local_ip` is the address the client reached the control connection on; passive
    /// listeners are bound there.
    pub fn new(store: Store, stream: Stream, local_ip: IpAddr) -> Self {
        FtpBuilder::default().build(store, stream, local_ip)
    }

    pub(crate) fn from_builder(
        builder: FtpBuilder,
        store: Store,
        stream: Stream,
        local_ip: IpAddr,
    ) -> Self {
        Ftp {
            store,
            stream,
            local_ip,
            welcome: builder.welcome,
            session: Session::new(),
        }
    }

    /// Runs the session until QUIT, end of stream, or a control-socket failure. Dropping
    /// `self` on return closes the control stream and any data channel still held.
    pub async fn handle(mut self) -> Result<(), HandleError> {
        let welcome = self.welcome.clone();
        self.write(FtpResponse::ReadyForNewUser(welcome)).await?;

        loop {
            let line = match self.read().await {
                Ok(LineRead::Line(line)) => line,
                Ok(LineRead::NotUtf8) => {
                    tracing::warn!("received command line that is not valid UTF-8");
                    self.write(FtpResponse::simple_msg(
                        SimpleReturnCode::SyntaxError,
                        "Command line is not valid UTF-8.",
                    ))
                    .await?;
                    continue;
                }
                Ok(LineRead::Disconnect) => {
                    tracing::info!("client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::error!(err = %e, "failed to read command");
                    return Err(e.into());
                }
            };

            let response = match line.parse::<Command>() {
                Ok(command) => {
                    log_command(&command);
                    self.dispatch(command).await?
                }
                Err(e) => self.parse_failure(&line, e),
            };

            let closing = response.is_closing();
            self.write(response).await?;

            if closing {
                tracing::info!(user = ?self.session.username(), "client quit");
                break;
            }
        }

        Ok(())
    }

    /// A known verb is still subject to the login gate when its argument is bad.
    fn parse_failure(&self, line: &str, e: ParseError) -> FtpResponse {
        if !self.session.is_authenticated()
            && Command::lookup_verb(line).is_some_and(|verb| !verb_allowed_before_login(verb))
        {
            return FtpResponse::simple(SimpleReturnCode::NotLoggedIn);
        }

        tracing::warn!(err = %e, "failed to parse command");
        e.into_ftp_response()
    }

    async fn dispatch(&mut self, command: Command) -> std::io::Result<FtpResponse> {
        if !self.session.is_authenticated() && !command.allowed_before_login() {
            return Ok(FtpResponse::simple(SimpleReturnCode::NotLoggedIn));
        }

        let response = match command {
            Command::User(user) => self.user(user.username),
            Command::Pass(pass) => self.pass(&pass.password).await,
            Command::Quit(_) => FtpResponse::simple(SimpleReturnCode::ClosingControlConnection),
            Command::Cwd(cwd) => self.cwd(cwd.path.as_deref()).await,
            Command::Cdup(_) => self.cwd(Some("..")).await,
            Command::Pwd(_) => self.pwd(),
            Command::Type(t) => self.set_type(t),
            Command::Stru(stru) => match stru.structure {
                FileStructure::File => FtpResponse::simple_msg(
                    SimpleReturnCode::Ok,
                    "Structure set to F.",
                ),
                FileStructure::Record | FileStructure::Page => {
                    FtpResponse::simple(SimpleReturnCode::ParameterNotImplemented)
                }
            },
            Command::Mode(mode) => match mode.mode {
                TransferMode::Stream => {
                    FtpResponse::simple_msg(SimpleReturnCode::Ok, "Mode set to S.")
                }
                TransferMode::Block | TransferMode::Compressed => {
                    FtpResponse::simple(SimpleReturnCode::ParameterNotImplemented)
                }
            },
            Command::Port(port) => {
                tracing::info!(addr = %port.addr, "active data channel requested");
                self.session.data_channel = Some(DataChannel::Active(port.addr));
                FtpResponse::simple_msg(SimpleReturnCode::Ok, "PORT command successful.")
            }
            Command::Pasv(_) => self.pasv().await,
            Command::List(list) => return self.list(list.path.as_deref()).await,
            Command::Retr(retr) => return self.retr(&retr.path).await,
            Command::Stor(stor) => return self.stor(&stor.path).await,
            Command::Dele(dele) => self.dele(&dele.path).await,
            Command::Mkd(mkd) => self.mkd(&mkd.path).await,
            Command::Rmd(rmd) => self.rmd(&rmd.path).await,
        };

        Ok(response)
    }

    fn user(&mut self, username: Option<String>) -> FtpResponse {
        if self.session.is_authenticated() {
            tracing::warn!("received USER after login");
            return FtpResponse::simple(SimpleReturnCode::BadSequence);
        }

        let Some(username) = username else {
            self.session.reset_login();
            return FtpResponse::simple_msg(SimpleReturnCode::NotLoggedIn, "User name required.");
        };

        if !self.store.user_exists(&username) {
            tracing::warn!(%username, "unknown user");
            self.session.reset_login();
            return FtpResponse::simple(SimpleReturnCode::NotLoggedIn);
        }

        self.session.await_password(username);
        FtpResponse::simple(SimpleReturnCode::NeedPassword)
    }

    async fn pass(&mut self, password: &str) -> FtpResponse {
        let username = match self.session.login_state() {
            LoginState::AwaitingPassword { username } => username.clone(),
            LoginState::Unauthenticated | LoginState::Authenticated { .. } => {
                tracing::warn!("received PASS out of sequence");
                return FtpResponse::simple(SimpleReturnCode::BadSequence);
            }
        };

        if !self.store.is_valid_login(&username, password) {
            tracing::warn!(%username, "authentication failed");
            self.session.reset_login();
            return FtpResponse::simple(SimpleReturnCode::NotLoggedIn);
        }

        let Some(root) = self.store.jail_root_for(&username) else {
            tracing::error!(%username, "no jail root configured");
            self.session.reset_login();
            return FtpResponse::simple(SimpleReturnCode::NotLoggedIn);
        };

        let root = match canonical_dir(&root).await {
            Ok(root) => root,
            Err(e) => {
                tracing::error!(%username, root = %root.display(), err = %e, "jail root unusable");
                self.session.reset_login();
                return FtpResponse::simple(SimpleReturnCode::NotLoggedIn);
            }
        };

        tracing::info!(%username, root = %root.display(), "user logged in");
        self.session.authenticate(root);
        FtpResponse::simple(SimpleReturnCode::UserLoggedIn)
    }

    async fn cwd(&mut self, raw: Option<&str>) -> FtpResponse {
        let Some(jail) = self.session.jail_mut() else {
            return FtpResponse::simple(SimpleReturnCode::NotLoggedIn);
        };

        let Some(dir) = jail.resolve(raw) else {
            return FtpResponse::simple(SimpleReturnCode::FileUnavailable);
        };

        if !is_dir(&dir).await {
            return FtpResponse::simple_msg(
                SimpleReturnCode::FileUnavailable,
                "No such directory.",
            );
        }

        jail.set_current_dir(dir);
        FtpResponse::simple_msg(
            SimpleReturnCode::FileActionOk,
            format!("Directory changed to {}.", jail.pwd()),
        )
    }

    fn pwd(&self) -> FtpResponse {
        match self.session.jail() {
            Some(jail) => FtpResponse::CurrentDirectory(jail.pwd()),
            None => FtpResponse::simple(SimpleReturnCode::NotLoggedIn),
        }
    }

    fn set_type(&mut self, t: Type) -> FtpResponse {
        let Some(transfer_type) = t.representation.transfer_type() else {
            return FtpResponse::simple(SimpleReturnCode::ParameterNotImplemented);
        };

        if matches!(
            t.format,
            Some(FormatControl::Telnet | FormatControl::CarriageControl)
        ) {
            return FtpResponse::simple(SimpleReturnCode::ParameterNotImplemented);
        }

        tracing::debug!(?transfer_type, "transfer type changed");
        self.session.transfer_type = transfer_type;
        FtpResponse::simple_msg(SimpleReturnCode::Ok, format!("Type set to {transfer_type:?}."))
    }

    async fn pasv(&mut self) -> FtpResponse {
        let bound = PassiveListener::bind(self.local_ip).await;

        // the previous descriptor is dropped here, closing any old listener
        self.session.data_channel = None;

        match bound {
            Ok(listener) => {
                let reply = listener.to_reply();
                self.session.data_channel = Some(DataChannel::Passive(listener));
                reply
            }
            Err(e @ DataChanError::NotIpv4(_)) => {
                tracing::error!(err = %e, "cannot enter passive mode");
                FtpResponse::simple(SimpleReturnCode::CommandNotImplemented)
            }
            Err(e) => {
                tracing::error!(err = %e, "failed to establish passive connection");
                FtpResponse::simple(SimpleReturnCode::FileActionNotTaken)
            }
        }
    }

    async fn list(&mut self, raw: Option<&str>) -> std::io::Result<FtpResponse> {
        let Some(dir) = self.resolve(raw) else {
            return Ok(FtpResponse::simple(SimpleReturnCode::FileUnavailable));
        };

        if !is_dir(&dir).await {
            return Ok(FtpResponse::simple_msg(
                SimpleReturnCode::FileUnavailable,
                "No such directory.",
            ));
        }

        self.transfer(PendingTransfer::List(dir)).await
    }

    async fn retr(&mut self, raw: &str) -> std::io::Result<FtpResponse> {
        let Some(path) = self.resolve(Some(raw)) else {
            return Ok(FtpResponse::simple(SimpleReturnCode::FileUnavailable));
        };

        if !is_file(&path).await {
            return Ok(FtpResponse::simple_msg(
                SimpleReturnCode::FileUnavailable,
                "File not found.",
            ));
        }

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "failed to open file");
                return Ok(FtpResponse::simple(SimpleReturnCode::FileUnavailable));
            }
        };

        self.transfer(PendingTransfer::Retrieve { path, file }).await
    }

    async fn stor(&mut self, raw: &str) -> std::io::Result<FtpResponse> {
        let Some(path) = self.resolve(Some(raw)) else {
            return Ok(FtpResponse::simple(SimpleReturnCode::FileActionNotTaken));
        };

        if is_dir(&path).await {
            return Ok(FtpResponse::simple_msg(
                SimpleReturnCode::FileActionNotTaken,
                "Target is a directory.",
            ));
        }

        self.transfer(PendingTransfer::Store(path)).await
    }

    /// Sends 150, runs the transfer on its own task and waits for it, then produces the
    /// final reply. The data channel is consumed whatever the outcome.
    async fn transfer(&mut self, pending: PendingTransfer) -> std::io::Result<FtpResponse> {
        let kind = pending.kind();

        let Some(channel) = self.session.data_channel.take() else {
            tracing::warn!(?pending, "transfer requested without PORT or PASV");
            return Ok(FtpResponse::simple_msg(
                SimpleReturnCode::FileActionNotTaken,
                "No data connection. Use PORT or PASV first.",
            ));
        };

        self.write(FtpResponse::simple(SimpleReturnCode::OpeningDataConnection))
            .await?;

        let transfer_type = self.session.transfer_type;
        let task = tokio::spawn(pending.run(channel, transfer_type));

        let response = match task.await {
            Ok(Ok(bytes)) => {
                tracing::info!(bytes, "transfer complete");
                FtpResponse::simple(SimpleReturnCode::ClosingDataConnectionSuccessful)
            }
            Ok(Err(e)) => {
                tracing::error!(?kind, err = %e, "transfer failed");
                kind.failure_reply(&e)
            }
            Err(e) => {
                tracing::error!(?kind, err = %e, "transfer task did not finish");
                FtpResponse::simple(SimpleReturnCode::FileActionNotTaken)
            }
        };

        Ok(response)
    }

    async fn dele(&mut self, raw: &str) -> FtpResponse {
        let Some(path) = self.resolve(Some(raw)) else {
            return FtpResponse::simple(SimpleReturnCode::FileUnavailable);
        };

        if !is_file(&path).await {
            return FtpResponse::simple_msg(SimpleReturnCode::FileUnavailable, "File not found.");
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "deleted file");
                FtpResponse::simple_msg(SimpleReturnCode::FileActionOk, "File deleted.")
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "failed to delete file");
                FtpResponse::simple(SimpleReturnCode::FileUnavailable)
            }
        }
    }

    async fn mkd(&mut self, raw: &str) -> FtpResponse {
        let Some(path) = self.resolve(Some(raw)) else {
            return FtpResponse::simple(SimpleReturnCode::FileUnavailable);
        };

        if tokio::fs::symlink_metadata(&path).await.is_ok() {
            return FtpResponse::simple_msg(SimpleReturnCode::FileUnavailable, "Already exists.");
        }

        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "created directory");
                FtpResponse::simple_msg(SimpleReturnCode::FileActionOk, "Directory created.")
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "failed to create directory");
                FtpResponse::simple(SimpleReturnCode::FileUnavailable)
            }
        }
    }

    async fn rmd(&mut self, raw: &str) -> FtpResponse {
        let Some(jail) = self.session.jail_mut() else {
            return FtpResponse::simple(SimpleReturnCode::NotLoggedIn);
        };

        let Some(path) = jail.resolve(Some(raw)) else {
            return FtpResponse::simple(SimpleReturnCode::FileUnavailable);
        };

        if path == jail.root() {
            return FtpResponse::simple_msg(
                SimpleReturnCode::FileUnavailable,
                "Cannot remove the root directory.",
            );
        }

        if !is_dir(&path).await {
            return FtpResponse::simple_msg(
                SimpleReturnCode::FileUnavailable,
                "No such directory.",
            );
        }

        match tokio::fs::remove_dir(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed directory");
                if jail.current_dir().starts_with(&path) {
                    let root = jail.root().to_path_buf();
                    jail.set_current_dir(root);
                }
                FtpResponse::simple_msg(SimpleReturnCode::FileActionOk, "Directory removed.")
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "failed to remove directory");
                FtpResponse::simple(SimpleReturnCode::FileUnavailable)
            }
        }
    }

    fn resolve(&self, raw: Option<&str>) -> Option<PathBuf> {
        self.session.jail()?.resolve(raw)
    }

    async fn read(&mut self) -> Result<LineRead, ReadError> {
        let mut buf = Vec::new();

        loop {
            let mut byte = [0u8; 1];

            let n = self.stream.read(&mut byte).await?;
            if n == 0 {
                break; // EOF
            }

            if byte[0] == b'\n' {
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                break;
            }

            buf.push(byte[0]);
            if buf.len() > MAX_LINE_LEN {
                return Err(ReadError::LineTooLong);
            }
        }

        let Ok(line) = String::from_utf8(buf) else {
            return Ok(LineRead::NotUtf8);
        };

        if line.trim().is_empty() {
            return Ok(LineRead::Disconnect);
        }

        Ok(LineRead::Line(line))
    }

    async fn write(&mut self, msg: FtpResponse) -> Result<(), std::io::Error> {
        tracing::debug!(code = msg.code(), "sending reply");
        self.write_bytes(&msg.to_bytes()).await
    }

    async fn write_bytes(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }
}

enum LineRead {
    Line(String),
    NotUtf8,
    Disconnect,
}

fn log_command(command: &Command) {
    match command {
        // variant name only, never the password
        Command::Pass(_) => tracing::info!(command = command.as_ref(), "handling command"),
        _ => tracing::info!(command = ?command, "handling command"),
    }
}

async fn canonical_dir(path: &std::path::Path) -> std::io::Result<PathBuf> {
    let canonical = tokio::fs::canonicalize(path).await?;
    if !tokio::fs::metadata(&canonical).await?.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            "jail root is not a directory",
        ));
    }
    Ok(canonical)
}

async fn is_dir(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn is_file(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
