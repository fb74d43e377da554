use std::path::PathBuf;

/// Source of truth for who may log in and where they are jailed.
///
/// Lookups are by exact username. The engine never mutates the store.
pub trait CredentialStore: Send + Sync {
    fn user_exists(&self, username: &str) -> bool;

    fn is_valid_login(&self, username: &str, password: &str) -> bool;

    /// The directory the user is confined to. It need not be canonical; the engine
    /// canonicalizes it at login.
    fn jail_root_for(&self, username: &str) -> Option<PathBuf>;
}

impl<T> CredentialStore for std::sync::Arc<T>
where
    T: CredentialStore + ?Sized,
{
    fn user_exists(&self, username: &str) -> bool {
        (**self).user_exists(username)
    }

    fn is_valid_login(&self, username: &str, password: &str) -> bool {
        (**self).is_valid_login(username, password)
    }

    fn jail_root_for(&self, username: &str) -> Option<PathBuf> {
        (**self).jail_root_for(username)
    }
}
