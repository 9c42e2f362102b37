use serde::{Deserialize, Serialize};

use super::claims::Claims;

/// Request body for user registration. Fields are optional so that absence
/// surfaces as a validation error rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}

/// Body of every authenticated page: a greeting plus the caller's claims.
#[derive(Debug, Serialize)]
pub struct ClaimsResponse {
    pub message: &'static str,
    pub user: Claims,
}
