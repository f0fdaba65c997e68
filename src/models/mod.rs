pub mod profile;
pub mod schema;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use profile::{Profile, BUSINESS_TYPES};
pub use schema::{FieldKind, FieldSpec, RoleSchema};

/// Marketplace role; decides a listing's fields and status set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Driver,
    Seller,
    Buyer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Farmer, Role::Driver, Role::Seller, Role::Buyer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Driver => "driver",
            Role::Seller => "seller",
            Role::Buyer => "buyer",
        }
    }

    /// Backend collection path segment, e.g. `farmer-posts`
    pub fn collection(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer-posts",
            Role::Driver => "driver-posts",
            Role::Seller => "seller-posts",
            Role::Buyer => "buyer-posts",
        }
    }

    pub fn schema(&self) -> &'static RoleSchema {
        match self {
            Role::Farmer => &schema::FARMER,
            Role::Driver => &schema::DRIVER,
            Role::Seller => &schema::SELLER,
            Role::Buyer => &schema::BUYER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role \"{0}\" (expected farmer, driver, seller or buyer)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Owner profile the backend attaches to a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Listing owner: either a bare id or a populated profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(String),
    Profile(Owner),
}

impl OwnerRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            OwnerRef::Id(id) => Some(id),
            OwnerRef::Profile(owner) => owner.id.as_deref(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            OwnerRef::Id(_) => None,
            OwnerRef::Profile(owner) => owner.name.as_deref(),
        }
    }
}

/// One role-specific post, as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<OwnerRef>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Role-specific scalar fields (title, area, itemNeeded, ...)
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Listing {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id() == Some(id)
    }

    /// Field value rendered as form text; empty when absent
    pub fn field_text(&self, name: &str) -> String {
        self.fields.get(name).map(value_text).unwrap_or_default()
    }

    /// Whether the backend sent a non-empty value for `name`
    pub fn has_field(&self, name: &str) -> bool {
        !self.field_text(name).is_empty()
    }

    /// Display name used in prompts, falling back to "this post"
    pub fn headline(&self, schema: &RoleSchema) -> String {
        let text = self.field_text(schema.headline);
        if text.trim().is_empty() {
            "this post".to_string()
        } else {
            text
        }
    }

    /// Case-insensitive match of `needle` (already lowercased) against the
    /// schema's fields and status; backend bookkeeping keys are not searched
    pub fn matches(&self, schema: &RoleSchema, needle: &str) -> bool {
        if self.status.to_lowercase().contains(needle) {
            return true;
        }
        schema
            .fields
            .iter()
            .any(|field| self.field_text(field.name).to_lowercase().contains(needle))
    }
}

/// Render a JSON scalar the way a form input shows it
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Backend acknowledgement of a deletion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteConfirmation {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
