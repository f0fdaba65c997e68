//! Client for the Krishi Setu marketplace: farmers, drivers, sellers and
//! buyers post listings to a REST backend; this crate keeps those listings,
//! their drafts and their image uploads consistent on the client side, and
//! manages the signed-in user's profile.

pub mod api;
pub mod config;
pub mod error;
pub mod listing;
pub mod models;
pub mod profile;
pub mod session;

pub use api::{
    HttpListingApi, HttpProfileApi, ImageFile, ListingApi, ProfileApi, ProfileUpdate,
    SubmissionPayload,
};
pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind, FieldErrors, ModalError, ValidationError};
pub use listing::{ListingFormController, ListingModal, ListingStore};
pub use models::{Listing, Profile, Role};
pub use profile::ProfileManager;
pub use session::{FileSession, MemorySession, SessionContext, UserInfo};
