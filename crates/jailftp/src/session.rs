use crate::{datachan::DataChannel, path, transfer::TransferType};
use std::path::{Path, PathBuf};

/// Login progress of a control connection.
#[derive(Debug)]
pub enum LoginState {
    Unauthenticated,
    AwaitingPassword { username: String },
    Authenticated { username: String, jail: Jail },
}

/// Per-connection state, owned by the connection's engine and dropped with it.
#[derive(Debug)]
pub struct Session {
    login: LoginState,
    pub transfer_type: TransferType,
    /// At most one live descriptor; PORT/PASV replace it, transfers take it.
    pub data_channel: Option<DataChannel>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            login: LoginState::Unauthenticated,
            transfer_type: TransferType::Ascii,
            data_channel: None,
        }
    }

    pub fn login_state(&self) -> &LoginState {
        &self.login
    }

    pub fn username(&self) -> Option<&str> {
        match &self.login {
            LoginState::Unauthenticated => None,
            LoginState::AwaitingPassword { username }
            | LoginState::Authenticated { username, .. } => Some(username),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.login, LoginState::Authenticated { .. })
    }

    pub fn await_password(&mut self, username: String) {
        self.login = LoginState::AwaitingPassword { username };
    }

    pub fn reset_login(&mut self) {
        self.login = LoginState::Unauthenticated;
    }

    /// Completes login for the pending user. `jail_root` must already be canonical.
    pub fn authenticate(&mut self, jail_root: PathBuf) {
        let username = match std::mem::replace(&mut self.login, LoginState::Unauthenticated) {
            LoginState::AwaitingPassword { username } | LoginState::Authenticated { username, .. } => {
                username
            }
            LoginState::Unauthenticated => return,
        };
        self.login = LoginState::Authenticated {
            username,
            jail: Jail::new(jail_root),
        };
    }

    pub fn jail(&self) -> Option<&Jail> {
        match &self.login {
            LoginState::Authenticated { jail, .. } => Some(jail),
            _ => None,
        }
    }

    pub fn jail_mut(&mut self) -> Option<&mut Jail> {
        match &mut self.login {
            LoginState::Authenticated { jail, .. } => Some(jail),
            _ => None,
        }
    }
}

/// The filesystem view of a logged-in session: a fixed root and a current directory that
/// is always the root or one of its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jail {
    root: PathBuf,
    current_dir: PathBuf,
}

impl Jail {
    pub fn new(root: PathBuf) -> Self {
        Self {
            current_dir: root.clone(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn resolve(&self, raw: Option<&str>) -> Option<PathBuf> {
        path::resolve(raw, &self.current_dir, &self.root)
    }

    /// Moves the current directory; anything outside the root resets it to the root.
    pub fn set_current_dir(&mut self, dir: PathBuf) {
        if dir.starts_with(&self.root) {
            self.current_dir = dir;
        } else {
            tracing::warn!(dir = %dir.display(), "current directory outside jail, resetting to root");
            self.current_dir = self.root.clone();
        }
    }

    /// Current directory as the client sees it.
    pub fn pwd(&self) -> String {
        path::virtual_path(&self.current_dir, &self.root)
    }
}
