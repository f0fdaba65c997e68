use crate::api::traits::{ListingApi, ProfileApi};
use crate::api::types::{ProfileUpdate, SubmissionPayload};
use crate::config::ClientConfig;
use crate::error::{ClientError, ValidationError};
use crate::models::{DeleteConfirmation, Listing, Profile, Role};
use crate::session::SessionContext;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error body shape the backend uses
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP plumbing shared by the REST clients: base URL, bearer auth and
/// status mapping
struct Backend {
    client: Client,
    api_url: Url,
    session: Arc<dyn SessionContext>,
}

impl Backend {
    fn new(config: &ClientConfig, session: Arc<dyn SessionContext>) -> Result<Self> {
        let api_url = Url::parse(config.api_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid API URL: {}", config.api_url))?;
        if api_url.cannot_be_a_base() {
            bail!("API URL {} cannot have paths appended", api_url);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("krishi-setu/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url,
            session,
        })
    }

    /// `api_url` plus `segments`, each percent-encoded as exactly one path
    /// segment (so `/` inside an id cannot reach another endpoint)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Attach the bearer token, or fail before anything is sent
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self
            .session
            .token()
            .ok_or_else(|| ClientError::Auth("User not authenticated".to_string()))?;
        Ok(request.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, ClientError> {
        debug!("Sending request to {}", action);

        let response = request.send().await.map_err(|e| {
            warn!("Failed to {}: {}", action, e);
            ClientError::from_transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected the session while trying to {}", action);
            self.session.invalidate();
            return Err(ClientError::Auth(error_message(response).await));
        }

        if !status.is_success() {
            let message = error_message(response).await;
            warn!("Failed to {}: {} {}", action, status, message);
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Backend's `message` if it sent one, else `Error <status>: <reason>`
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        })
}

/// REST client for the `/api/{role}-posts` endpoints
pub struct HttpListingApi {
    backend: Backend,
}

impl HttpListingApi {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionContext>) -> Result<Self> {
        Ok(Self {
            backend: Backend::new(config, session)?,
        })
    }

    fn collection_url(&self, role: Role) -> Url {
        self.backend.endpoint(&[role.collection()])
    }

    fn item_url(&self, role: Role, id: &str) -> Result<Url, ClientError> {
        if matches!(id.trim(), "" | "." | "..") {
            return Err(ValidationError::InvalidId(id.to_string()).into());
        }
        Ok(self.backend.endpoint(&[role.collection(), id]))
    }
}

#[async_trait]
impl ListingApi for HttpListingApi {
    async fn fetch_all(&self, role: Role) -> Result<Vec<Listing>, ClientError> {
        let request = self.backend.client.get(self.collection_url(role));
        self.backend.send(request, &format!("fetch {} posts", role)).await
    }

    async fn fetch_mine(&self, role: Role) -> Result<Vec<Listing>, ClientError> {
        let url = self.backend.endpoint(&[role.collection(), "my"]);
        let request = self.backend.authorized(self.backend.client.get(url))?;
        self.backend.send(request, &format!("fetch your {} posts", role)).await
    }

    async fn create(
        &self,
        role: Role,
        payload: &SubmissionPayload,
    ) -> Result<Listing, ClientError> {
        let url = self.collection_url(role);
        let request = self.backend.authorized(self.backend.client.post(url))?;
        let request = request.multipart(payload.to_form()?);
        self.backend.send(request, &format!("create {} post", role)).await
    }

    async fn update(
        &self,
        role: Role,
        id: &str,
        payload: &SubmissionPayload,
    ) -> Result<Listing, ClientError> {
        let url = self.item_url(role, id)?;
        let request = self.backend.authorized(self.backend.client.put(url))?;
        let request = request.multipart(payload.to_form()?);
        self.backend.send(request, &format!("update {} post {}", role, id)).await
    }

    async fn delete(&self, role: Role, id: &str) -> Result<DeleteConfirmation, ClientError> {
        let url = self.item_url(role, id)?;
        let request = self.backend.authorized(self.backend.client.delete(url))?;
        self.backend.send(request, &format!("delete {} post {}", role, id)).await
    }

    fn backend_name(&self) -> &str {
        self.backend.api_url.as_str()
    }
}

/// REST client for `/api/auth/me` and `/api/auth/profile`
pub struct HttpProfileApi {
    backend: Backend,
}

impl HttpProfileApi {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionContext>) -> Result<Self> {
        Ok(Self {
            backend: Backend::new(config, session)?,
        })
    }
}

#[async_trait]
impl ProfileApi for HttpProfileApi {
    async fn me(&self) -> Result<Profile, ClientError> {
        let url = self.backend.endpoint(&["auth", "me"]);
        let request = self.backend.authorized(self.backend.client.get(url))?;
        self.backend.send(request, "fetch your profile").await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        let url = self.backend.endpoint(&["auth", "profile"]);
        let request = self.backend.authorized(self.backend.client.put(url))?;
        let request = request.multipart(update.to_form()?);
        self.backend.send(request, "update your profile").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ImageFile;
    use crate::session::MemorySession;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer, session: Arc<MemorySession>) -> HttpListingApi {
        let config = ClientConfig {
            api_url: format!("{}/api", server.uri()),
            ..ClientConfig::default()
        };
        HttpListingApi::new(&config, session).unwrap()
    }

    fn farmer_payload() -> SubmissionPayload {
        let mut payload = SubmissionPayload::default();
        payload.fields.insert("title".into(), "Harvest Job".into());
        payload.fields.insert("status".into(), "Active".into());
        payload
    }

    #[tokio::test]
    async fn fetch_all_is_public() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/farmer-posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "_id": "f1", "title": "Harvest Job", "status": "Active" }
            ])))
            .mount(&server)
            .await;

        let api = api_for(&server, Arc::new(MemorySession::anonymous()));
        let listings = api.fetch_all(Role::Farmer).await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id(), Some("f1"));
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn fetch_mine_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/driver-posts/my"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, Arc::new(MemorySession::with_token("tok-1")));
        assert!(api.fetch_mine(Role::Driver).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let server = MockServer::start().await;
        let api = api_for(&server, Arc::new(MemorySession::anonymous()));

        let err = api.fetch_mine(Role::Buyer).await.unwrap_err();

        assert!(matches!(err, ClientError::Auth(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_invalidates_session() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })),
            )
            .mount(&server)
            .await;

        let session = Arc::new(MemorySession::with_token("stale"));
        let api = api_for(&server, session.clone());

        let err = api.delete(Role::Seller, "s1").await.unwrap_err();
        assert_eq!(err, ClientError::Auth("Token expired".to_string()));
        assert!(session.token().is_none());
    }

    #[tokio::test]
    async fn server_message_is_surfaced_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/farmer-posts"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "Price must be positive" })),
            )
            .mount(&server)
            .await;

        let api = api_for(&server, Arc::new(MemorySession::with_token("t")));
        let err = api.create(Role::Farmer, &farmer_payload()).await.unwrap_err();

        assert_eq!(
            err,
            ClientError::Server {
                status: 400,
                message: "Price must be positive".to_string()
            }
        );
    }

    #[tokio::test]
    async fn server_error_without_message_gets_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let api = api_for(&server, Arc::new(MemorySession::with_token("t")));
        let err = api
            .update(Role::Farmer, "f1", &farmer_payload())
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Error 500: Internal Server Error");
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let config = ClientConfig {
            api_url: "http://127.0.0.1:9/api".to_string(),
            timeout: std::time::Duration::from_secs(2),
            ..ClientConfig::default()
        };
        let api = HttpListingApi::new(&config, Arc::new(MemorySession::anonymous())).unwrap();

        let err = api.fetch_all(Role::Buyer).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn create_sends_multipart_with_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/farmer-posts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "_id": "f9", "title": "Harvest Job", "status": "Active",
                "imageUrl": "/uploads/f9.png"
            })))
            .mount(&server)
            .await;

        let mut payload = farmer_payload();
        payload.image = Some(ImageFile::new("field.png", "image/png", b"PNGDATA".to_vec()));

        let api = api_for(&server, Arc::new(MemorySession::with_token("t")));
        let created = api.create(Role::Farmer, &payload).await.unwrap();
        assert_eq!(created.image_url.as_deref(), Some("/uploads/f9.png"));

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"title\""));
        assert!(body.contains("Harvest Job"));
        assert!(body.contains("name=\"image\"; filename=\"field.png\""));
        assert!(body.contains("PNGDATA"));
    }

    #[tokio::test]
    async fn delete_returns_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/buyer-posts/b2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "b2", "message": "Buyer post removed"
            })))
            .mount(&server)
            .await;

        let api = api_for(&server, Arc::new(MemorySession::with_token("t")));
        let confirmation = api.delete(Role::Buyer, "b2").await.unwrap();
        assert_eq!(confirmation.id, "b2");
        assert_eq!(confirmation.message.as_deref(), Some("Buyer post removed"));
    }

    #[tokio::test]
    async fn undecodable_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let api = api_for(&server, Arc::new(MemorySession::anonymous()));
        let err = api.fetch_all(Role::Seller).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn item_id_is_encoded_as_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "../../auth/profile", "message": "removed"
            })))
            .mount(&server)
            .await;

        let api = api_for(&server, Arc::new(MemorySession::with_token("t")));
        api.delete(Role::Farmer, "../../auth/profile").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url.path(),
            "/api/farmer-posts/..%2F..%2Fauth%2Fprofile"
        );
    }

    #[tokio::test]
    async fn dot_segment_ids_are_rejected_before_sending() {
        let server = MockServer::start().await;
        let api = api_for(&server, Arc::new(MemorySession::with_token("t")));

        for id in ["", "..", "."] {
            let err = api.delete(Role::Seller, id).await.unwrap_err();
            assert_eq!(
                err,
                ClientError::Validation(ValidationError::InvalidId(id.to_string()))
            );
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn base_url_with_trailing_slash_joins_cleanly() {
        let config = ClientConfig {
            api_url: "http://localhost:5000/api/".to_string(),
            ..ClientConfig::default()
        };
        let api = HttpListingApi::new(&config, Arc::new(MemorySession::anonymous())).unwrap();
        assert_eq!(
            api.collection_url(Role::Driver).as_str(),
            "http://localhost:5000/api/driver-posts"
        );
        assert_eq!(
            api.item_url(Role::Driver, "d 1").unwrap().as_str(),
            "http://localhost:5000/api/driver-posts/d%201"
        );
    }

    #[test]
    fn unparseable_api_url_is_a_config_error() {
        let config = ClientConfig {
            api_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(HttpListingApi::new(&config, Arc::new(MemorySession::anonymous())).is_err());
    }

    fn profile_api_for(server: &MockServer, session: Arc<MemorySession>) -> HttpProfileApi {
        let config = ClientConfig {
            api_url: format!("{}/api", server.uri()),
            ..ClientConfig::default()
        };
        HttpProfileApi::new(&config, session).unwrap()
    }

    #[tokio::test]
    async fn me_reads_profile_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("authorization", "Bearer tok-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": "u1",
                "name": "Ravi",
                "email": "ravi@example.in",
                "mobile": "9876543210",
                "location": "Pune",
                "businessType": ["Farmer"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = profile_api_for(&server, Arc::new(MemorySession::with_token("tok-9")));
        let profile = api.me().await.unwrap();
        assert_eq!(profile.name, "Ravi");
        assert_eq!(profile.business_type, ["Farmer"]);
    }

    #[tokio::test]
    async fn me_with_rejected_token_invalidates_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Not authorized" })))
            .mount(&server)
            .await;

        let session = Arc::new(MemorySession::with_token("stale"));
        let api = profile_api_for(&server, session.clone());

        assert_eq!(
            api.me().await.unwrap_err(),
            ClientError::Auth("Not authorized".to_string())
        );
        assert!(session.token().is_none());
    }

    #[tokio::test]
    async fn update_profile_sends_multipart_fields_and_picture() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/auth/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": "u1",
                "name": "Ravi Patil",
                "businessType": ["Farmer", "Seller"],
                "profilePicture": "/uploads/u1.png"
            })))
            .mount(&server)
            .await;

        let update = ProfileUpdate {
            name: " Ravi Patil ".into(),
            mobile: "9876543210".into(),
            location: "Pune".into(),
            business_types: vec!["Farmer".into(), "Seller".into()],
            password: Some("secret1".into()),
            picture: Some(ImageFile::new("me.png", "image/png", b"PNGDATA".to_vec())),
        };
        let api = profile_api_for(&server, Arc::new(MemorySession::with_token("t")));
        let saved = api.update_profile(&update).await.unwrap();
        assert_eq!(saved.profile_picture.as_deref(), Some("/uploads/u1.png"));

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("Ravi Patil"));
        assert!(!body.contains(" Ravi Patil "));
        assert!(body.contains(r#"["Farmer","Seller"]"#));
        assert!(body.contains("name=\"password\""));
        assert!(body.contains("name=\"profilePicture\"; filename=\"me.png\""));
    }
}
