use crate::error::{ClientError, FieldErrors, ValidationError};
use crate::models::{Profile, BUSINESS_TYPES};
use reqwest::multipart::{Form, Part};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Upload limit for listing images (5 MiB)
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Multipart part name the backend reads the image from
pub const IMAGE_PART: &str = "image";

/// Multipart part name for a new profile picture
pub const PROFILE_PICTURE_PART: &str = "profilePicture";

pub const MIN_PASSWORD_LEN: usize = 6;

/// A locally selected image, not yet uploaded
#[derive(Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its media type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| IMAGE_PART.to_string());

        Ok(Self::new(file_name, media_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Image media type and at most [`MAX_IMAGE_BYTES`]
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.media_type.starts_with("image/") {
            return Err(ValidationError::InvalidImageType {
                media_type: self.media_type.clone(),
            });
        }
        if self.size() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge { size: self.size() });
        }
        Ok(())
    }

    /// Multipart file part carrying this image
    pub fn to_part(&self) -> Result<Part, ValidationError> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.media_type)
            .map_err(|_| ValidationError::InvalidImageType {
                media_type: self.media_type.clone(),
            })
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// What gets sent on create/update: scalar fields plus an optional
/// freshly selected image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPayload {
    pub fields: BTreeMap<String, String>,
    pub image: Option<ImageFile>,
}

impl SubmissionPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Build the multipart body: one text part per field, image under `image`
    pub fn to_form(&self) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }

        if let Some(image) = &self.image {
            form = form.part(IMAGE_PART, image.to_part()?);
        }

        Ok(form)
    }
}

/// Edits to the user's own profile, sent to `PUT /auth/profile`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: String,
    pub mobile: String,
    pub location: String,
    pub business_types: Vec<String>,
    /// New password; `None` keeps the current one
    pub password: Option<String>,
    pub picture: Option<ImageFile>,
}

impl ProfileUpdate {
    /// Start from the current profile; password and picture unchanged
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            mobile: profile.mobile.clone(),
            location: profile.location.clone(),
            business_types: profile.business_type.clone(),
            password: None,
            picture: None,
        }
    }

    /// Check everything the backend would reject, before sending
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() || self.mobile.trim().is_empty() {
            let message = "Name and Mobile cannot be empty.".to_string();
            if self.name.trim().is_empty() {
                errors.insert("name".into(), message.clone());
            }
            if self.mobile.trim().is_empty() {
                errors.insert("mobile".into(), message);
            }
        }

        if self.business_types.is_empty() {
            errors.insert(
                "businessType".into(),
                "Please select at least one business type.".into(),
            );
        } else if let Some(unknown) = self
            .business_types
            .iter()
            .find(|t| !BUSINESS_TYPES.contains(&t.as_str()))
        {
            errors.insert(
                "businessType".into(),
                format!("\"{unknown}\" is not a business type ({})", BUSINESS_TYPES.join(", ")),
            );
        }

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            if password.chars().count() < MIN_PASSWORD_LEN {
                errors.insert(
                    "password".into(),
                    format!("New password must be at least {MIN_PASSWORD_LEN} characters."),
                );
            }
        }

        if !errors.is_empty() {
            return Err(ValidationError::Fields(errors));
        }
        if let Some(picture) = &self.picture {
            picture.validate()?;
        }
        Ok(())
    }

    /// Multipart body; `businessType` travels as a JSON array string
    pub fn to_form(&self) -> Result<Form, ClientError> {
        let business_types = serde_json::to_string(&self.business_types)
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        let mut form = Form::new()
            .text("name", self.name.trim().to_string())
            .text("mobile", self.mobile.trim().to_string())
            .text("location", self.location.trim().to_string())
            .text("businessType", business_types);

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            form = form.text("password", password.to_string());
        }
        if let Some(picture) = &self.picture {
            form = form.part(PROFILE_PICTURE_PART, picture.to_part()?);
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_mebibytes_is_accepted() {
        let image = ImageFile::new("a.png", "image/png", vec![0u8; MAX_IMAGE_BYTES as usize]);
        assert!(image.validate().is_ok());
    }

    #[test]
    fn one_byte_over_is_too_large() {
        let image = ImageFile::new("a.png", "image/png", vec![0u8; MAX_IMAGE_BYTES as usize + 1]);
        assert_eq!(
            image.validate(),
            Err(ValidationError::ImageTooLarge {
                size: MAX_IMAGE_BYTES + 1
            })
        );
    }

    #[test]
    fn non_image_is_rejected_regardless_of_size() {
        let image = ImageFile::new("notes.pdf", "application/pdf", vec![1, 2, 3]);
        assert!(matches!(
            image.validate(),
            Err(ValidationError::InvalidImageType { .. })
        ));
    }

    #[test]
    fn debug_hides_bytes() {
        let image = ImageFile::new("a.png", "image/png", vec![7u8; 3]);
        let debug = format!("{image:?}");
        assert!(debug.contains("size: 3"));
        assert!(!debug.contains("[7, 7, 7]"));
    }

    #[tokio::test]
    async fn from_path_guesses_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.jpg");
        tokio::fs::write(&path, b"jpeg").await.unwrap();

        let image = ImageFile::from_path(&path).await.unwrap();
        assert_eq!(image.file_name, "field.jpg");
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.size(), 4);
    }

    #[test]
    fn form_builds_with_and_without_image() {
        let mut payload = SubmissionPayload::default();
        payload.fields.insert("title".into(), "Harvest Job".into());
        assert!(payload.to_form().is_ok());

        payload.image = Some(ImageFile::new("a.png", "image/png", vec![1]));
        assert!(payload.to_form().is_ok());
    }

    fn ravi_update() -> ProfileUpdate {
        ProfileUpdate {
            name: "Ravi".into(),
            mobile: "9876543210".into(),
            location: "Pune".into(),
            business_types: vec!["Farmer".into()],
            ..ProfileUpdate::default()
        }
    }

    #[test]
    fn profile_update_needs_name_and_mobile() {
        let update = ProfileUpdate {
            mobile: "  ".into(),
            ..ravi_update()
        };
        match update.validate() {
            Err(ValidationError::Fields(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors["mobile"], "Name and Mobile cannot be empty.");
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn profile_update_needs_a_known_business_type() {
        let none = ProfileUpdate {
            business_types: Vec::new(),
            ..ravi_update()
        };
        let Err(ValidationError::Fields(errors)) = none.validate() else {
            panic!("empty business types accepted");
        };
        assert_eq!(errors["businessType"], "Please select at least one business type.");

        let unknown = ProfileUpdate {
            business_types: vec!["Trader".into()],
            ..ravi_update()
        };
        assert!(unknown.validate().is_err());
    }

    #[test]
    fn short_password_is_rejected_and_blank_means_unchanged() {
        let short = ProfileUpdate {
            password: Some("abc".into()),
            ..ravi_update()
        };
        assert!(short.validate().is_err());

        let blank = ProfileUpdate {
            password: Some(String::new()),
            ..ravi_update()
        };
        assert!(blank.validate().is_ok());
    }

    #[test]
    fn oversized_profile_picture_is_rejected() {
        let update = ProfileUpdate {
            picture: Some(ImageFile::new(
                "me.png",
                "image/png",
                vec![0u8; MAX_IMAGE_BYTES as usize + 1],
            )),
            ..ravi_update()
        };
        assert!(matches!(
            update.validate(),
            Err(ValidationError::ImageTooLarge { .. })
        ));
    }
}
