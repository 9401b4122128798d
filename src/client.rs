// src/client.rs

use crate::ambulance::AmbulanceHandle;
use crate::case::CaseHandle;
use crate::error::EmelocError;
use crate::tracking::TrackingHandle;
use crate::user::{SigninRequest, SigninResponse, User, UserHandle};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Which deployment a request is routed to.
///
/// The EmeLoc product runs as two separate services: the backend that owns
/// users, ambulances, and cases, and the dispatch service that creates a
/// case together with its tracking email and patient share link. The
/// dispatch service is optional; operations that need it fail with
/// [`EmelocError::DispatchUnconfigured`] when no URL was provided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ServiceTarget {
    /// The main REST backend; endpoints live under `/api/`.
    Backend,
    /// The dispatch/tracking service; endpoints are joined verbatim.
    Dispatch,
}

/// The main client for interacting with the EmeLoc services.
///
/// `EmelocClient` holds the service base URLs, the underlying
/// `reqwest::Client`, and the bearer token of the signed-in user. Typed
/// operations are exposed through handles obtained from this client
/// ([`users()`](Self::users), [`ambulances()`](Self::ambulances),
/// [`cases()`](Self::cases), [`tracking()`](Self::tracking)).
///
/// # Initialization
///
/// ```rust,no_run
/// use emeloc_rs::Emeloc;
/// # use emeloc_rs::EmelocError;
///
/// # fn main() -> Result<(), EmelocError> {
/// let client = Emeloc::new(
///     "https://emeloc-backend.example.com",
///     Some("https://emeloc-dispatch.example.com"),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EmelocClient {
    pub server_url: String,
    pub(crate) dispatch_url: Option<String>,
    pub(crate) http_client: Client,
    pub(crate) session_token: Option<String>,
}

impl EmelocClient {
    /// Creates a new `EmelocClient`.
    ///
    /// # Arguments
    ///
    /// * `server_url`: The base URL of the EmeLoc backend. The client
    ///   normalizes it (defaults the scheme to `http://` when absent and
    ///   strips a trailing `/api` segment, so both `https://host` and
    ///   `https://host/api` work).
    /// * `dispatch_url`: Optional base URL of the dispatch/tracking service.
    ///   Required only for case dispatch and tracking-email initiation.
    ///
    /// # Returns
    ///
    /// The new client, or an `EmelocError` if either URL is unusable.
    pub fn new(server_url: &str, dispatch_url: Option<&str>) -> Result<Self, EmelocError> {
        let server_url = Self::normalize_base_url(server_url, "/api")?;
        let dispatch_url = match dispatch_url {
            Some(url) => Some(Self::normalize_base_url(url, "")?),
            None => None,
        };

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(EmelocError::ReqwestError)?;

        log::debug!(
            "EmelocClient initialized with backend: {}, dispatch: {:?}",
            server_url,
            dispatch_url
        );

        Ok(Self {
            server_url,
            dispatch_url,
            http_client,
            session_token: None,
        })
    }

    // Ensures a scheme, validates the URL, and strips trailing slashes plus
    // an optional known suffix, yielding the true service base.
    fn normalize_base_url(raw: &str, strip_suffix: &str) -> Result<String, EmelocError> {
        let mut candidate = raw.to_string();
        if !candidate.starts_with("http://") && !candidate.starts_with("https://") {
            candidate = format!("http://{}", candidate);
        }

        let parsed = Url::parse(&candidate)?;
        if parsed.cannot_be_a_base() {
            return Err(EmelocError::SdkError(format!(
                "The URL '{}' cannot be a base URL. Provide a full service base (e.g. https://host).",
                raw
            )));
        }

        let mut base = parsed.as_str().trim_end_matches('/').to_string();
        if !strip_suffix.is_empty() && base.ends_with(strip_suffix) {
            base.truncate(base.len() - strip_suffix.len());
        }
        if base.is_empty() {
            return Err(EmelocError::InvalidUrl(format!(
                "URL '{}' became empty after normalization",
                raw
            )));
        }
        Ok(base)
    }

    // Internal method to set or clear the session token.
    pub(crate) fn _set_session_token(&mut self, token: Option<String>) {
        self.session_token = token;
    }

    /// Returns the current bearer token, if the client is signed in.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Checks if the client currently holds a session token.
    pub fn is_authenticated(&self) -> bool {
        self.session_token.is_some()
    }

    /// Signs in against the backend and stores the returned bearer token on
    /// the client for subsequent requests.
    ///
    /// Corresponds to POST api/auth/signin.
    ///
    /// ```rust,no_run
    /// # use emeloc_rs::{Emeloc, EmelocError};
    /// use emeloc_rs::user::SigninRequest;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), EmelocError> {
    /// # let mut client = Emeloc::new("https://emeloc-backend.example.com", None)?;
    /// let response = client
    ///     .signin(&SigninRequest {
    ///         email: "operator@example.com",
    ///         username: "operator1",
    ///         phone: "+910000000000",
    ///     })
    ///     .await?;
    /// println!("signed in as {}", response.user.email);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn signin(
        &mut self,
        credentials: &SigninRequest<'_>,
    ) -> Result<SigninResponse, EmelocError> {
        let response: SigninResponse = self
            ._request(Method::POST, "auth/signin", Some(credentials))
            .await?;
        self._set_session_token(Some(response.token.clone()));
        Ok(response)
    }

    /// Discards the stored bearer token. Token invalidation is owned by the
    /// backend; this only clears the client's copy.
    pub fn signout(&mut self) {
        self._set_session_token(None);
    }

    /// Retrieves the signed-in user's profile.
    /// Corresponds to GET api/auth/profile.
    pub async fn profile(&self) -> Result<User, EmelocError> {
        if self.session_token.is_none() {
            return Err(EmelocError::SessionTokenMissing);
        }
        self._request(Method::GET, "auth/profile", None::<&Value>)
            .await
    }

    /// Returns a handle for user/operator operations.
    pub fn users(&self) -> UserHandle<'_> {
        UserHandle::new(self)
    }

    /// Returns a handle for ambulance operations.
    pub fn ambulances(&self) -> AmbulanceHandle<'_> {
        AmbulanceHandle::new(self)
    }

    /// Returns a handle for case operations.
    pub fn cases(&self) -> CaseHandle<'_> {
        CaseHandle::new(self)
    }

    /// Returns a handle for tracking-email operations.
    pub fn tracking(&self) -> TrackingHandle<'_> {
        TrackingHandle::new(self)
    }

    // Backend request: endpoint is relative to <server_url>/api/.
    pub(crate) async fn _request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&T>,
    ) -> Result<R, EmelocError>
    where
        T: Serialize + Send + Sync,
        R: DeserializeOwned + Send + 'static,
    {
        self._request_to(ServiceTarget::Backend, method, endpoint, body)
            .await
    }

    pub(crate) async fn _request_to<T, R>(
        &self,
        target: ServiceTarget,
        method: Method,
        endpoint: &str,
        body: Option<&T>,
    ) -> Result<R, EmelocError>
    where
        T: Serialize + Send + Sync,
        R: DeserializeOwned + Send + 'static,
    {
        let full_url = self.endpoint_url(target, endpoint)?;

        log::debug!(
            "Preparing request: Method={}, URL={}, Authenticated={}",
            method,
            full_url.as_str(),
            self.session_token.is_some()
        );

        let mut request_builder = self.http_client.request(method, full_url.clone());

        // The dispatch service is reached by patients following emailed
        // links; it takes no credentials. Backend requests carry the bearer
        // token whenever one is set.
        if target == ServiceTarget::Backend {
            if let Some(token) = &self.session_token {
                let header_value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(EmelocError::InvalidHeaderValue)?;
                request_builder = request_builder.header(AUTHORIZATION, header_value);
            }
        }

        if let Some(body_data) = body {
            request_builder = request_builder.json(body_data);
        }

        let response = request_builder
            .send()
            .await
            .map_err(EmelocError::ReqwestError)?;

        if response.status().is_success() {
            if response.status() == reqwest::StatusCode::NO_CONTENT {
                return serde_json::from_str("{}").map_err(EmelocError::JsonError);
            }
            let body_bytes = response.bytes().await.map_err(EmelocError::ReqwestError)?;
            serde_json::from_slice(&body_bytes).map_err(|e| {
                log::error!(
                    "Deserialization failed for successful response from '{}': {}. Body: {}",
                    full_url,
                    e,
                    String::from_utf8_lossy(&body_bytes)
                );
                EmelocError::JsonDeserializationFailed(format!(
                    "Failed to deserialize successful response from '{}': {}",
                    full_url, e
                ))
            })
        } else {
            let status = response.status();
            let error_body_bytes = response.bytes().await.map_err(EmelocError::ReqwestError)?;
            let error_body_str = String::from_utf8_lossy(&error_body_bytes).to_string();
            log::warn!(
                "Request failed with status {}. Response body: {}",
                status,
                error_body_str
            );
            match serde_json::from_slice::<Value>(&error_body_bytes) {
                Ok(json_value) => Err(EmelocError::from_response(status.as_u16(), json_value)),
                Err(_) => {
                    let fallback_json = serde_json::json!({ "error": error_body_str });
                    Err(EmelocError::from_response(status.as_u16(), fallback_json))
                }
            }
        }
    }

    fn endpoint_url(&self, target: ServiceTarget, endpoint: &str) -> Result<Url, EmelocError> {
        let (base, path) = match target {
            ServiceTarget::Backend => (
                self.server_url.as_str(),
                format!("/api/{}", endpoint.trim_start_matches('/')),
            ),
            ServiceTarget::Dispatch => {
                let base = self.dispatch_url.as_deref().ok_or_else(|| {
                    EmelocError::DispatchUnconfigured(format!(
                        "cannot reach '{}' without a dispatch service URL",
                        endpoint
                    ))
                })?;
                (base, format!("/{}", endpoint.trim_start_matches('/')))
            }
        };

        let base_url = Url::parse(base).map_err(|e| {
            EmelocError::InvalidUrl(format!("Base URL '{}' is invalid: {}", base, e))
        })?;
        base_url.join(&path).map_err(|e| {
            EmelocError::InvalidUrl(format!(
                "Failed to join base URL '{}' with path '{}': {}",
                base, path, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backend_url_variants() {
        for raw in [
            "https://emeloc.example.com",
            "https://emeloc.example.com/",
            "https://emeloc.example.com/api",
        ] {
            let client = EmelocClient::new(raw, None).unwrap();
            assert_eq!(client.server_url, "https://emeloc.example.com");
        }
    }

    #[test]
    fn defaults_missing_scheme_to_http() {
        let client = EmelocClient::new("localhost:3000", None).unwrap();
        assert_eq!(client.server_url, "http://localhost:3000");
    }

    #[test]
    fn backend_endpoints_live_under_api() {
        let client = EmelocClient::new("https://emeloc.example.com", None).unwrap();
        let url = client
            .endpoint_url(ServiceTarget::Backend, "ambulances")
            .unwrap();
        assert_eq!(url.as_str(), "https://emeloc.example.com/api/ambulances");
    }

    #[test]
    fn dispatch_endpoints_join_verbatim() {
        let client = EmelocClient::new(
            "https://emeloc.example.com",
            Some("https://dispatch.example.com/"),
        )
        .unwrap();
        let url = client
            .endpoint_url(ServiceTarget::Dispatch, "live-location")
            .unwrap();
        assert_eq!(url.as_str(), "https://dispatch.example.com/live-location");
    }

    #[test]
    fn dispatch_without_url_is_a_typed_error() {
        let client = EmelocClient::new("https://emeloc.example.com", None).unwrap();
        let err = client
            .endpoint_url(ServiceTarget::Dispatch, "live-location")
            .unwrap_err();
        assert!(matches!(err, EmelocError::DispatchUnconfigured(_)));
    }

    #[test]
    fn signout_clears_the_token() {
        let mut client = EmelocClient::new("https://emeloc.example.com", None).unwrap();
        client._set_session_token(Some("tok".to_string()));
        assert!(client.is_authenticated());
        client.signout();
        assert!(!client.is_authenticated());
        assert_eq!(client.session_token(), None);
    }
}
