//! Session credentials.
//!
//! [`Credentials`] are built once by the shell (login form, OAuth flow, environment)
//! and handed to the coordinator, which passes them by reference to every remote call.
//! The secret never appears in `Debug` output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the user authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    UsernamePassword,
    PersonalAccessToken,
    FederatedSignIn,
}

impl AuthMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            AuthMethod::UsernamePassword => "Username & Password",
            AuthMethod::PersonalAccessToken => "Personal Access Token",
            AuthMethod::FederatedSignIn => "Federated Sign-In",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Secret material that refuses to print itself
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Author identity attached to commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    method: AuthMethod,
    username: String,
    secret: Secret,
    remote_url: Option<String>,
}

impl Credentials {
    pub fn new(method: AuthMethod, username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            method,
            username: username.into(),
            secret: Secret::new(secret),
            remote_url: None,
        }
    }

    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(AuthMethod::UsernamePassword, username, password)
    }

    pub fn personal_access_token(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(AuthMethod::PersonalAccessToken, username, token)
    }

    /// Token produced by an external sign-in flow
    pub fn federated(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(AuthMethod::FederatedSignIn, username, token)
    }

    /// Credentials for local-only work; remote calls will be refused by the server
    pub fn anonymous(username: impl Into<String>) -> Self {
        Self::new(AuthMethod::UsernamePassword, username, "")
    }

    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref()
    }

    /// The secret sent to the server: the token for token-based methods, the password otherwise
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Placeholder identity `username@<domain>`; not a verified address
    pub fn commit_identity(&self, email_domain: &str) -> CommitIdentity {
        CommitIdentity {
            name: self.username.clone(),
            email: format!("{}@{}", self.username, email_domain),
        }
    }
}
