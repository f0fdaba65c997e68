//! Authenticated session state.
//!
//! The token is obtained by the login flow and handed to the client through a
//! [`SessionContext`]. Owner-scoped requests read it from there, and a `401`
//! from the backend invalidates it.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Login response as persisted on the client
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Source of the bearer token for owner-scoped calls
pub trait SessionContext: Send + Sync {
    fn user(&self) -> Option<UserInfo>;

    /// Replace the stored login, e.g. after a profile edit renamed the user
    fn save(&self, user: UserInfo) -> Result<(), SessionError>;

    /// Forget the session (logout, or the backend rejected the token)
    fn invalidate(&self);

    fn token(&self) -> Option<String> {
        self.user()
            .map(|u| u.token)
            .filter(|token| !token.is_empty())
    }
}

/// Session held only in memory
#[derive(Debug, Default)]
pub struct MemorySession {
    user: RwLock<Option<UserInfo>>,
}

impl MemorySession {
    pub fn new(user: UserInfo) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(UserInfo {
            token: token.into(),
            ..UserInfo::default()
        })
    }
}

impl SessionContext for MemorySession {
    fn user(&self) -> Option<UserInfo> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, user: UserInfo) -> Result<(), SessionError> {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
        Ok(())
    }

    fn invalidate(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Session persisted as a JSON file
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    user: RwLock<Option<UserInfo>>,
}

impl FileSession {
    /// Open the session file. A missing file means "logged out"; a corrupted
    /// one is removed and also treated as logged out.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let user = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<UserInfo>(&contents) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Corrupted session file {}: {}", path.display(), e);
                    std::fs::remove_file(&path)?;
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded session from {} (logged in: {})", path.display(), user.is_some());
        Ok(Self {
            path,
            user: RwLock::new(user),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionContext for FileSession {
    fn user(&self) -> Option<UserInfo> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Write the login to disk, then adopt it
    fn save(&self, user: UserInfo) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(&user)?;
        std::fs::write(&self.path, json)?;
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
        Ok(())
    }

    fn invalidate(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed session file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove session file {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ravi() -> UserInfo {
        UserInfo {
            id: "u1".into(),
            name: "Ravi".into(),
            email: "ravi@example.in".into(),
            role: Some("farmer".into()),
            token: "tok-123".into(),
            profile_picture: None,
        }
    }

    #[test]
    fn memory_session_invalidates() {
        let session = MemorySession::new(ravi());
        assert_eq!(session.token().as_deref(), Some("tok-123"));
        session.invalidate();
        assert!(session.token().is_none());
        assert!(session.user().is_none());
    }

    #[test]
    fn empty_token_is_no_token() {
        assert!(MemorySession::with_token("").token().is_none());
        assert!(MemorySession::anonymous().token().is_none());
    }

    #[test]
    fn file_session_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let session = FileSession::load(&path).unwrap();
        assert!(session.user().is_none());
        session.save(ravi()).unwrap();

        let reopened = FileSession::load(&path).unwrap();
        assert_eq!(reopened.user(), Some(ravi()));

        reopened.invalidate();
        assert!(!path.exists());
        assert!(reopened.token().is_none());
    }

    #[test]
    fn corrupted_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let session = FileSession::load(&path).unwrap();
        assert!(session.user().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn reads_backend_login_shape() {
        let user: UserInfo = serde_json::from_str(
            r#"{"_id":"u1","name":"Ravi","email":"r@x.in","role":"buyer","token":"t","profilePicture":"/uploads/p.png"}"#,
        )
        .unwrap();
        assert_eq!(user.profile_picture.as_deref(), Some("/uploads/p.png"));
        assert_eq!(user.role.as_deref(), Some("buyer"));
    }
}
