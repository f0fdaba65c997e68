use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Business types a user can register under
pub const BUSINESS_TYPES: [&str; 4] = ["Farmer", "Driver", "Buyer", "Seller"];

/// The authenticated user's account, as returned by `/auth/me`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub mobile: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    /// Anything other than a list of strings reads as empty
    #[serde(default, deserialize_with = "lenient_list")]
    pub business_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_me_response() {
        let profile: Profile = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Ravi",
            "email": "ravi@example.in",
            "mobile": "9876543210",
            "location": "Pune",
            "businessType": ["Farmer", "Seller"],
            "profilePicture": "/uploads/ravi.png"
        }))
        .unwrap();

        assert_eq!(profile.business_type, ["Farmer", "Seller"]);
        assert_eq!(profile.profile_picture.as_deref(), Some("/uploads/ravi.png"));
    }

    #[test]
    fn missing_or_malformed_fields_default() {
        let profile: Profile = serde_json::from_value(json!({
            "_id": "u2",
            "name": "Asha",
            "mobile": null,
            "businessType": "Farmer",
            "profilePicture": null
        }))
        .unwrap();

        assert!(profile.business_type.is_empty());
        assert!(profile.mobile.is_empty());
        assert!(profile.profile_picture.is_none());
    }
}
