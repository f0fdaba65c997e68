use crate::api::types::{ProfileUpdate, SubmissionPayload};
use crate::error::ClientError;
use crate::models::{DeleteConfirmation, Listing, Profile, Role};
use async_trait::async_trait;

/// Backend operations on one role's listings
/// This lets the store run against the real REST API or an in-process fake
#[async_trait]
pub trait ListingApi: Send + Sync {
    /// Public listing read
    async fn fetch_all(&self, role: Role) -> Result<Vec<Listing>, ClientError>;

    /// Listings owned by the authenticated user
    async fn fetch_mine(&self, role: Role) -> Result<Vec<Listing>, ClientError>;

    /// Create a listing; returns the backend's canonical copy
    async fn create(&self, role: Role, payload: &SubmissionPayload)
        -> Result<Listing, ClientError>;

    /// Replace the listing `id`; returns the backend's canonical copy
    async fn update(
        &self,
        role: Role,
        id: &str,
        payload: &SubmissionPayload,
    ) -> Result<Listing, ClientError>;

    async fn delete(&self, role: Role, id: &str) -> Result<DeleteConfirmation, ClientError>;

    /// Name of the backend, for logs
    fn backend_name(&self) -> &str;
}

/// The authenticated user's own account
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Current profile; also confirms the stored token is still accepted
    async fn me(&self) -> Result<Profile, ClientError>;

    /// Save edits; returns the profile as the backend stored it
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError>;
}
