use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ErrorResponse;

/// Minimum password length accepted by the member endpoint.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum nickname length accepted by the member endpoint.
pub const MAX_NICKNAME_LENGTH: usize = 100;

/// Profile snapshot of the signed-in member, as held by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("ADMIN")
    }
}

/// Member as returned by `/api/auth/me` and `/api/members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub role: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<NaiveDateTime>,
}

impl MemberResponse {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            nickname: self.nickname.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ErrorResponse> {
        let mut violations = Vec::new();
        if self.email.trim().is_empty() {
            violations.push(("email", Some(self.email.as_str()), "Please enter your email."));
        }
        if self.password.trim().is_empty() {
            violations.push(("password", None, "Please enter your password."));
        }
        ErrorResponse::from_violations(violations)
    }
}

/// Token payload returned by login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "tokenType", default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds (0 when the server omits it)
    #[serde(rename = "expiresIn", default)]
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
}

impl SignupRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            nickname: nickname.into(),
        }
    }

    /// Check the same constraints the member endpoint enforces, so obvious
    /// mistakes are reported without a round trip.
    pub fn validate(&self) -> Result<(), ErrorResponse> {
        let mut violations = Vec::new();

        let email = self.email.trim();
        if email.is_empty() {
            violations.push(("email", Some(self.email.as_str()), "Please enter your email."));
        } else if !looks_like_email(email) {
            violations.push((
                "email",
                Some(self.email.as_str()),
                "Please enter a valid email address.",
            ));
        }

        if self.password.trim().is_empty() {
            violations.push(("password", None, "Please enter your password."));
        } else if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            violations.push(("password", None, "Password must be at least 8 characters."));
        }

        let nickname = self.nickname.trim();
        if nickname.is_empty() {
            violations.push(("nickname", Some(self.nickname.as_str()), "Please enter a nickname."));
        } else if self.nickname.chars().count() > MAX_NICKNAME_LENGTH {
            violations.push((
                "nickname",
                Some(self.nickname.as_str()),
                "Nickname must be at most 100 characters.",
            ));
        }

        ErrorResponse::from_violations(violations)
    }
}

/// Loose `local@domain.tld` shape check; the server has the final word.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}
