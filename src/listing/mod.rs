//! Generic create/edit/delete workflow shared by every role's listings.
//!
//! [`ListingFormController`] owns a draft, [`ListingModal`] binds it to an
//! open/submit lifecycle, and [`ListingStore`] keeps the list in step with
//! the backend.

pub mod form;
pub mod modal;
pub mod notify;
pub mod preview;
pub mod store;

pub use form::ListingFormController;
pub use modal::{ListingModal, ModalMode, ModalPhase, Submission};
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use preview::{Preview, PreviewHandle, PreviewStore};
pub use store::{DeleteRequest, ListingStore, LoadState, Scope};
