pub mod http;
pub mod traits;
pub mod types;

pub use http::{HttpListingApi, HttpProfileApi};
pub use traits::{ListingApi, ProfileApi};
pub use types::{ImageFile, ProfileUpdate, SubmissionPayload, MAX_IMAGE_BYTES};
