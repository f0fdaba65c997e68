//! The signed-in user's own profile.
//!
//! Reads go to `/auth/me`; edits are validated locally, sent to
//! `/auth/profile`, and the returned name and picture are written back into
//! the stored session so the rest of the client shows the new values.

use crate::api::{ProfileApi, ProfileUpdate};
use crate::error::ClientError;
use crate::listing::notify::{Notice, Notifier, TracingNotifier};
use crate::models::Profile;
use crate::session::SessionContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ProfileManager {
    api: Arc<dyn ProfileApi>,
    session: Arc<dyn SessionContext>,
    notifier: Arc<dyn Notifier>,
    saving: Arc<AtomicBool>,
}

/// Clears the saving flag however the save ends
struct SavingGuard(Arc<AtomicBool>);

impl Drop for SavingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ProfileManager {
    pub fn new(
        api: Arc<dyn ProfileApi>,
        session: Arc<dyn SessionContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            notifier,
            saving: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_tracing(api: Arc<dyn ProfileApi>, session: Arc<dyn SessionContext>) -> Self {
        Self::new(api, session, Arc::new(TracingNotifier))
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Fetch the profile, checking the stored token with the backend
    pub async fn load(&self) -> Result<Profile, ClientError> {
        match self.api.me().await {
            Ok(profile) => {
                debug!("Loaded profile for {}", profile.email);
                Ok(profile)
            }
            Err(err) => {
                self.notifier.notify(Notice::error(&err));
                Err(err)
            }
        }
    }

    /// Validate and save `update`; on success the session picks up the new
    /// name and picture
    pub async fn save(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        if let Err(err) = update.validate() {
            let err = ClientError::from(err);
            self.notifier.notify(Notice::error(&err));
            return Err(err);
        }

        if self.saving.swap(true, Ordering::SeqCst) {
            return Err(ClientError::Busy("saving your profile".to_string()));
        }
        let _guard = SavingGuard(Arc::clone(&self.saving));

        let profile = match self.api.update_profile(update).await {
            Ok(profile) => profile,
            Err(err) => {
                self.notifier.notify(Notice::error(&err));
                return Err(err);
            }
        };

        self.remember(&profile);
        info!("Updated profile for {}", profile.name);
        self.notifier
            .notify(Notice::success("Profile updated successfully!"));
        Ok(profile)
    }

    /// Merge the saved name and picture into the stored login, keeping the
    /// token. A failed write only costs a stale display name.
    fn remember(&self, profile: &Profile) {
        let Some(mut user) = self.session.user() else {
            debug!("No stored login to update after profile save");
            return;
        };
        user.name = profile.name.clone();
        user.profile_picture = profile.profile_picture.clone();

        if let Err(e) = self.session.save(user) {
            warn!("Failed to store updated profile in session: {}", e);
        }
    }
}
