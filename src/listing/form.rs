//! Draft state for one listing being created or edited.

use crate::api::{ImageFile, SubmissionPayload};
use crate::config::resolve_asset_url;
use crate::error::{FieldErrors, ValidationError};
use crate::listing::preview::{Preview, PreviewStore};
use crate::models::{FieldKind, Listing, RoleSchema};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Owns one draft listing and the rules for changing it.
///
/// The draft is exclusively owned: a modal creates one controller per open
/// and hands it nowhere else. Any local preview it holds is revoked by
/// [`release`](Self::release), by re-initializing, or when it is dropped.
#[derive(Debug)]
pub struct ListingFormController {
    schema: &'static RoleSchema,
    previews: PreviewStore,
    asset_base_url: String,
    seed: Option<Listing>,
    values: BTreeMap<&'static str, String>,
    status: String,
    image: Option<ImageFile>,
    preview: Preview,
}

impl ListingFormController {
    /// New controller holding an empty create-mode draft
    pub fn new(
        schema: &'static RoleSchema,
        previews: PreviewStore,
        asset_base_url: impl Into<String>,
    ) -> Self {
        let mut form = Self {
            schema,
            previews,
            asset_base_url: asset_base_url.into(),
            seed: None,
            values: BTreeMap::new(),
            status: schema.default_status().to_string(),
            image: None,
            preview: Preview::None,
        };
        form.initialize(None);
        form
    }

    /// Reset the draft: empty for create mode, or a copy of `seed` for edit
    /// mode. Any previous draft is discarded.
    pub fn initialize(&mut self, seed: Option<&Listing>) {
        self.release();

        self.values = self
            .schema
            .fields
            .iter()
            .map(|field| {
                let value = seed.map(|s| s.field_text(field.name)).unwrap_or_default();
                (field.name, value)
            })
            .collect();

        self.status = match seed {
            Some(listing) if self.schema.is_status(&listing.status) => listing.status.clone(),
            Some(listing) => {
                warn!(
                    "Listing {:?} has status {:?} outside the {} set; using {}",
                    listing.id,
                    listing.status,
                    self.schema.role,
                    self.schema.default_status()
                );
                self.schema.default_status().to_string()
            }
            None => self.schema.default_status().to_string(),
        };

        self.seed = seed.cloned();
        self.preview = self.seed_preview();
    }

    fn seed_preview(&self) -> Preview {
        self.seed
            .as_ref()
            .and_then(|s| s.image_url.as_deref())
            .filter(|path| !path.is_empty())
            .map(|path| Preview::Remote(resolve_asset_url(&self.asset_base_url, path)))
            .unwrap_or_default()
    }

    pub fn schema(&self) -> &'static RoleSchema {
        self.schema
    }

    /// Listing being edited, if any
    pub fn seed(&self) -> Option<&Listing> {
        self.seed.as_ref()
    }

    pub fn is_edit(&self) -> bool {
        self.seed.is_some()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        if name == "status" {
            return Some(&self.status);
        }
        self.values.get(name).map(String::as_str)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn image(&self) -> Option<&ImageFile> {
        self.image.as_ref()
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview.url()
    }

    /// Update exactly one field. `status` must be one of the role's values.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), ValidationError> {
        let value = value.into();

        if name == "status" {
            if !self.schema.is_status(&value) {
                return Err(ValidationError::InvalidStatus { value });
            }
            self.status = value;
            return Ok(());
        }

        let field = self
            .schema
            .field(name)
            .ok_or_else(|| ValidationError::UnknownField(name.to_string()))?;
        self.values.insert(field.name, value);
        Ok(())
    }

    /// Select (`Some`) or clear (`None`) the image attachment.
    ///
    /// A rejected file leaves the draft untouched. On acceptance the new
    /// preview is derived first and only then swapped in, revoking the old one.
    pub async fn set_image(&mut self, file: Option<ImageFile>) -> Result<(), ValidationError> {
        let Some(file) = file else {
            self.preview.release();
            self.image = None;
            self.preview = self.seed_preview();
            return Ok(());
        };

        file.validate()?;

        let preview = match self.previews.create(&file).await {
            Ok(handle) => Preview::Local(handle),
            Err(e) => {
                warn!("Could not derive preview for {}: {}", file.file_name, e);
                Preview::None
            }
        };

        debug!("Selected image {} ({} bytes)", file.file_name, file.size());
        self.preview.release();
        self.preview = preview;
        self.image = Some(file);
        Ok(())
    }

    /// Check every declared rule; returns all failures at once
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::new();

        for field in self.schema.fields {
            let value = self.values.get(field.name).map(|v| v.trim()).unwrap_or("");

            if value.is_empty() {
                if field.required {
                    errors.insert(field.name.to_string(), format!("{} is required", field.label));
                }
                continue;
            }

            if let FieldKind::Number { min } = field.kind {
                match value.parse::<f64>() {
                    Ok(n) if n.is_finite() => {
                        if let Some(min) = min.filter(|&min| n < min) {
                            errors.insert(
                                field.name.to_string(),
                                format!("{} must be at least {}", field.label, min),
                            );
                        }
                    }
                    _ => {
                        errors.insert(
                            field.name.to_string(),
                            format!("{} must be a number", field.label),
                        );
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(errors))
        }
    }

    /// Snapshot of the draft for sending.
    ///
    /// Required fields and status are always present. An optional field is
    /// present when filled in, or when the seed listing had it (so an edit
    /// can clear it). Only a freshly selected image is attached.
    pub fn to_submission_payload(&self) -> SubmissionPayload {
        let mut fields: BTreeMap<String, String> = self
            .schema
            .fields
            .iter()
            .filter_map(|field| {
                let value = self.values.get(field.name).cloned().unwrap_or_default();
                let seeded = self.seed.as_ref().is_some_and(|s| s.has_field(field.name));
                (field.required || !value.trim().is_empty() || seeded)
                    .then(|| (field.name.to_string(), value))
            })
            .collect();
        fields.insert("status".to_string(), self.status.clone());

        SubmissionPayload {
            fields,
            image: self.image.clone(),
        }
    }

    /// Free the local preview and drop the selected file
    pub fn release(&mut self) {
        self.preview.release();
        self.image = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MAX_IMAGE_BYTES;
    use crate::models::Role;
    use serde_json::json;

    const ASSETS: &str = "http://localhost:5000";

    fn farmer_form(previews: &PreviewStore) -> ListingFormController {
        ListingFormController::new(Role::Farmer.schema(), previews.clone(), ASSETS)
    }

    fn png(size: usize) -> ImageFile {
        ImageFile::new("field.png", "image/png", vec![0u8; size])
    }

    fn seeded_listing() -> Listing {
        serde_json::from_value(json!({
            "_id": "f1",
            "title": "Harvest Job",
            "area": "10 Acres",
            "price": 5000,
            "workTime": "6AM-3PM",
            "status": "Inactive",
            "imageUrl": "/uploads/f1.jpg"
        }))
        .unwrap()
    }

    #[test]
    fn create_mode_starts_empty_with_default_status() {
        let form = farmer_form(&PreviewStore::new());
        assert!(!form.is_edit());
        assert_eq!(form.field("title"), Some(""));
        assert_eq!(form.status(), "Active");
        assert!(form.preview_url().is_none());
    }

    #[test]
    fn edit_mode_copies_seed() {
        let mut form = farmer_form(&PreviewStore::new());
        form.initialize(Some(&seeded_listing()));

        assert!(form.is_edit());
        assert_eq!(form.field("price"), Some("5000"));
        assert_eq!(form.field("workTime"), Some("6AM-3PM"));
        assert_eq!(form.status(), "Inactive");
        assert_eq!(
            form.preview_url(),
            Some("http://localhost:5000/uploads/f1.jpg")
        );
    }

    #[test]
    fn unknown_status_in_seed_falls_back_to_default() {
        let mut listing = seeded_listing();
        listing.status = "ACTIVE".into();
        let mut form = farmer_form(&PreviewStore::new());
        form.initialize(Some(&listing));
        assert_eq!(form.status(), "Active");
    }

    #[test]
    fn set_field_rejects_unknown_names_and_statuses() {
        let mut form = farmer_form(&PreviewStore::new());
        assert_eq!(
            form.set_field("itemNeeded", "x"),
            Err(ValidationError::UnknownField("itemNeeded".into()))
        );
        assert!(form.set_field("status", "Sold Out").is_err());
        assert_eq!(form.status(), "Active");
        form.set_field("status", "Inactive").unwrap();
        assert_eq!(form.status(), "Inactive");
    }

    #[tokio::test]
    async fn image_at_limit_is_accepted() {
        let previews = PreviewStore::new();
        let mut form = farmer_form(&previews);
        form.set_image(Some(png(MAX_IMAGE_BYTES as usize))).await.unwrap();
        assert!(form.image().is_some());
        assert!(form.preview().is_local());
        assert_eq!(previews.live(), 1);
    }

    #[tokio::test]
    async fn rejected_image_keeps_previous_selection() {
        let previews = PreviewStore::new();
        let mut form = farmer_form(&previews);
        form.set_image(Some(png(16))).await.unwrap();
        let before = form.preview_url().map(str::to_string);

        let too_big = form.set_image(Some(png(MAX_IMAGE_BYTES as usize + 1))).await;
        assert_eq!(
            too_big,
            Err(ValidationError::ImageTooLarge {
                size: MAX_IMAGE_BYTES + 1
            })
        );
        let not_image = form
            .set_image(Some(ImageFile::new("a.txt", "text/plain", vec![1])))
            .await;
        assert!(matches!(not_image, Err(ValidationError::InvalidImageType { .. })));

        assert_eq!(form.image().map(ImageFile::size), Some(16));
        assert_eq!(form.preview_url().map(str::to_string), before);
        assert_eq!(previews.live(), 1);
    }

    #[tokio::test]
    async fn new_selection_revokes_old_preview() {
        let previews = PreviewStore::new();
        let mut form = farmer_form(&previews);
        form.set_image(Some(png(4))).await.unwrap();
        form.set_image(Some(png(8))).await.unwrap();
        assert_eq!(previews.live(), 1);
        assert_eq!(form.image().map(ImageFile::size), Some(8));
    }

    #[tokio::test]
    async fn clearing_selection_reverts_to_seed_image() {
        let previews = PreviewStore::new();
        let mut form = farmer_form(&previews);
        form.initialize(Some(&seeded_listing()));
        form.set_image(Some(png(4))).await.unwrap();

        form.set_image(None).await.unwrap();
        assert!(form.image().is_none());
        assert_eq!(
            form.preview_url(),
            Some("http://localhost:5000/uploads/f1.jpg")
        );
        assert_eq!(previews.live(), 0);
    }

    #[tokio::test]
    async fn release_and_reinitialize_free_previews() {
        let previews = PreviewStore::new();
        let mut form = farmer_form(&previews);
        form.set_image(Some(png(4))).await.unwrap();
        form.release();
        assert_eq!(previews.live(), 0);

        form.set_image(Some(png(4))).await.unwrap();
        form.initialize(None);
        assert_eq!(previews.live(), 0);
        assert!(form.image().is_none());

        form.set_image(Some(png(4))).await.unwrap();
        drop(form);
        assert_eq!(previews.live(), 0);
    }

    #[test]
    fn validate_reports_every_rule() {
        let mut form = farmer_form(&PreviewStore::new());
        form.set_field("title", "  ").unwrap();
        form.set_field("area", "10 Acres").unwrap();
        form.set_field("price", "-5").unwrap();

        let Err(ValidationError::Fields(errors)) = form.validate() else {
            panic!("expected field errors");
        };
        assert_eq!(errors.get("title").unwrap(), "Title is required");
        assert_eq!(errors.get("price").unwrap(), "Price (₹) must be at least 0");
        assert_eq!(errors.get("workTime").unwrap(), "Work Time is required");
        assert!(!errors.contains_key("area"));
        assert!(!errors.contains_key("description"));

        form.set_field("price", "five").unwrap();
        let Err(ValidationError::Fields(errors)) = form.validate() else {
            panic!("expected field errors");
        };
        assert_eq!(errors.get("price").unwrap(), "Price (₹) must be a number");
    }

    #[tokio::test]
    async fn payload_carries_fresh_image_only() {
        let mut form = farmer_form(&PreviewStore::new());
        form.initialize(Some(&seeded_listing()));
        assert!(form.to_submission_payload().image.is_none());

        form.set_image(Some(png(4))).await.unwrap();
        let payload = form.to_submission_payload();
        assert_eq!(payload.image.as_ref().map(|i| i.file_name.as_str()), Some("field.png"));
        assert!(!payload.fields.contains_key("imageUrl"));
    }

    #[test]
    fn cleared_optional_field_is_sent_when_seeded() {
        let mut listing = seeded_listing();
        listing
            .fields
            .insert("description".into(), json!("Paddy harvest"));
        let mut form = farmer_form(&PreviewStore::new());
        form.initialize(Some(&listing));
        form.set_field("description", "").unwrap();

        let payload = form.to_submission_payload();
        assert_eq!(payload.field("description"), Some(""));
    }

    #[test]
    fn empty_optional_field_is_omitted_on_create() {
        let form = farmer_form(&PreviewStore::new());
        let payload = form.to_submission_payload();
        assert!(payload.field("description").is_none());
        assert_eq!(payload.field("title"), Some(""));
        assert_eq!(payload.field("status"), Some("Active"));
    }
}
