// src/user.rs

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EmelocError;
use crate::Emeloc;

/// A backend user account (operator or admin).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: String,
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<i32>,

    // Catch-all for fields the backend adds without notice.
    #[serde(flatten)]
    pub other_fields: std::collections::HashMap<String, Value>,
}

/// Request body for `POST api/auth/signin`.
#[derive(Serialize, Debug)]
pub struct SigninRequest<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub phone: &'a str,
}

/// Response from a successful sign-in.
#[derive(Debug, Deserialize, Clone)]
pub struct SigninResponse {
    pub token: String,
    pub user: User,
}

/// Fields accepted when creating or updating an operator.
#[derive(Serialize, Debug, Default)]
pub struct OperatorPayload<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<&'a str>,
    pub shift: Option<i32>,
    pub gender: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct OperatorsResponse {
    #[serde(default)]
    operators: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct UserIdResponse {
    id: String,
}

/// Provides methods for managing user accounts.
pub struct UserHandle<'a> {
    client: &'a Emeloc,
}

impl<'a> UserHandle<'a> {
    pub(crate) fn new(client: &'a Emeloc) -> Self {
        UserHandle { client }
    }

    /// Lists all operator accounts.
    /// Corresponds to GET api/users/operators.
    pub async fn operators(&self) -> Result<Vec<User>, EmelocError> {
        let response: OperatorsResponse = self
            .client
            ._request(Method::GET, "users/operators", None::<&Value>)
            .await?;
        Ok(response.operators)
    }

    /// Resolves a user id from an email address.
    /// Corresponds to GET api/users/by-email?email=...
    pub async fn id_by_email(&self, email: &str) -> Result<String, EmelocError> {
        let endpoint = format!(
            "users/by-email?email={}",
            url::form_urlencoded::byte_serialize(email.as_bytes()).collect::<String>()
        );
        let response: UserIdResponse = self
            .client
            ._request(Method::GET, &endpoint, None::<&Value>)
            .await?;
        Ok(response.id)
    }

    /// Creates an operator account.
    pub async fn create(&self, operator: &OperatorPayload<'_>) -> Result<Value, EmelocError> {
        self.client
            ._request(Method::POST, "users", Some(operator))
            .await
    }

    /// Updates an existing account.
    pub async fn update(
        &self,
        id: &str,
        operator: &OperatorPayload<'_>,
    ) -> Result<Value, EmelocError> {
        let endpoint = format!("users/{}", id);
        self.client
            ._request(Method::PUT, &endpoint, Some(operator))
            .await
    }

    /// Deletes an account.
    pub async fn delete(&self, id: &str) -> Result<(), EmelocError> {
        let endpoint = format!("users/{}", id);
        let _: Value = self
            .client
            ._request(Method::DELETE, &endpoint, None::<&Value>)
            .await?;
        Ok(())
    }
}
