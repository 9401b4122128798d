use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::EmelocError;

// Public HTTP verb wrappers for backend endpoints the typed handles do not
// cover. Endpoints are relative to <server_url>/api/.
impl crate::Emeloc {
    pub async fn get<R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
    ) -> Result<R, EmelocError> {
        self._request(Method::GET, endpoint, None::<&Value>).await
    }

    pub async fn post<T: Serialize + Send + Sync, R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<R, EmelocError> {
        self._request(Method::POST, endpoint, Some(data)).await
    }

    pub async fn put<T: Serialize + Send + Sync, R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<R, EmelocError> {
        self._request(Method::PUT, endpoint, Some(data)).await
    }

    pub async fn delete<R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
    ) -> Result<R, EmelocError> {
        self._request(Method::DELETE, endpoint, None::<&Value>)
            .await
    }
}
