//! Open/cancel/submit contract around a [`ListingFormController`].

use crate::api::SubmissionPayload;
use crate::error::{ClientError, FieldErrors, ModalError, ValidationError};
use crate::listing::form::ListingFormController;
use crate::listing::preview::PreviewStore;
use crate::listing::store::ListingStore;
use crate::models::{Listing, RoleSchema};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Closed,
    /// A draft is live; `visible` only affects rendering
    Open { visible: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    Create,
    Edit,
}

/// Prepared request handed from the modal to the store
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Create(SubmissionPayload),
    Update { id: String, payload: SubmissionPayload },
}

impl Submission {
    pub fn payload(&self) -> &SubmissionPayload {
        match self {
            Submission::Create(payload) => payload,
            Submission::Update { payload, .. } => payload,
        }
    }
}

/// Create/edit dialog for one role. Mode follows from whether a seed listing
/// was supplied to [`open`](Self::open).
#[derive(Debug)]
pub struct ListingModal {
    schema: &'static RoleSchema,
    previews: PreviewStore,
    asset_base_url: String,
    phase: ModalPhase,
    form: Option<ListingFormController>,
    submitting: bool,
    errors: FieldErrors,
}

impl ListingModal {
    pub fn new(
        schema: &'static RoleSchema,
        previews: PreviewStore,
        asset_base_url: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            previews,
            asset_base_url: asset_base_url.into(),
            phase: ModalPhase::Closed,
            form: None,
            submitting: false,
            errors: FieldErrors::new(),
        }
    }

    /// Open with a fresh draft: empty for create, pre-filled for edit
    pub fn open(&mut self, seed: Option<&Listing>) -> Result<(), ModalError> {
        if self.submitting {
            return Err(ModalError::Submitting);
        }

        let form = self.form.get_or_insert_with(|| {
            ListingFormController::new(self.schema, self.previews.clone(), self.asset_base_url.clone())
        });
        form.initialize(seed);

        self.errors.clear();
        self.phase = ModalPhase::Open { visible: true };
        debug!(
            "Opened {} modal ({:?})",
            self.schema.noun,
            self.mode()
        );
        Ok(())
    }

    pub fn hide(&mut self) {
        if let ModalPhase::Open { visible } = &mut self.phase {
            *visible = false;
        }
    }

    pub fn show(&mut self) {
        if let ModalPhase::Open { visible } = &mut self.phase {
            *visible = true;
        }
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, ModalPhase::Open { .. })
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.phase, ModalPhase::Open { visible: true })
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn mode(&self) -> Option<ModalMode> {
        if !self.is_open() {
            return None;
        }
        self.form.as_ref().map(|form| {
            if form.is_edit() {
                ModalMode::Edit
            } else {
                ModalMode::Create
            }
        })
    }

    /// Heading, e.g. "Add Farmer Post" / "Edit Farmer Post"
    pub fn title(&self) -> String {
        match self.mode() {
            Some(ModalMode::Edit) => format!("Edit {}", self.schema.noun),
            _ => format!("Add {}", self.schema.noun),
        }
    }

    pub fn schema(&self) -> &'static RoleSchema {
        self.schema
    }

    /// Inline messages from the last blocked submit
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn form(&self) -> Option<&ListingFormController> {
        self.form.as_ref().filter(|_| self.is_open())
    }

    /// Editable draft; `None` while closed or submitting
    pub fn form_mut(&mut self) -> Option<&mut ListingFormController> {
        if !self.is_open() || self.submitting {
            return None;
        }
        self.form.as_mut()
    }

    /// Discard the draft and close without submitting
    pub fn cancel(&mut self) -> Result<(), ModalError> {
        if self.submitting {
            return Err(ModalError::Submitting);
        }
        self.close();
        Ok(())
    }

    fn close(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.release();
        }
        self.errors.clear();
        self.phase = ModalPhase::Closed;
    }

    /// Validate and hand out the payload; controls stay disabled until
    /// [`finish_submit`](Self::finish_submit)
    pub fn begin_submit(&mut self) -> Result<Submission, ModalError> {
        if self.submitting {
            return Err(ModalError::Submitting);
        }
        let form = match (&self.phase, self.form.as_ref()) {
            (ModalPhase::Open { .. }, Some(form)) => form,
            _ => return Err(ModalError::NotOpen),
        };

        if let Err(err) = form.validate() {
            if let ValidationError::Fields(errors) = &err {
                self.errors = errors.clone();
            }
            debug!("Blocked {} submit: {}", self.schema.noun, err);
            return Err(err.into());
        }

        let payload = form.to_submission_payload();
        let submission = match form.seed() {
            None => Submission::Create(payload),
            Some(seed) => match seed.id() {
                Some(id) => Submission::Update {
                    id: id.to_string(),
                    payload,
                },
                None => {
                    warn!("Refusing to submit {} edit without an id", self.schema.noun);
                    return Err(ModalError::MissingId);
                }
            },
        };

        self.errors.clear();
        self.submitting = true;
        Ok(submission)
    }

    /// Apply the handler's outcome: close on success, re-enable on failure
    pub fn finish_submit(
        &mut self,
        outcome: Result<Listing, ClientError>,
    ) -> Result<Listing, ModalError> {
        self.submitting = false;
        match outcome {
            Ok(listing) => {
                self.close();
                Ok(listing)
            }
            Err(err) => {
                if let ClientError::Validation(ValidationError::Fields(errors)) = &err {
                    self.errors = errors.clone();
                }
                Err(err.into())
            }
        }
    }

    /// Run the whole submit against `store`
    pub async fn submit_to(&mut self, store: &ListingStore) -> Result<Listing, ModalError> {
        let outcome = match self.begin_submit()? {
            Submission::Create(payload) => store.create(&payload).await,
            Submission::Update { id, payload } => store.update(&id, &payload).await,
        };
        self.finish_submit(outcome)
    }
}
