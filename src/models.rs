use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Identity Schemas (Shared with the Identity Service) ---

/// UserType
///
/// The closed set of account kinds issued by the Identity Service. The same value
/// travels inside the credential token (`userType` claim) and inside the user object
/// returned by `GET /api/auth/me`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum UserType {
    #[default]
    Normal,
    Instructor,
    Admin,
    Superadmin,
}

impl UserType {
    /// Elevated account kinds allowed into admin-restricted areas.
    pub fn is_admin(self) -> bool {
        matches!(self, UserType::Admin | UserType::Superadmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Normal => "NORMAL",
            UserType::Instructor => "INSTRUCTOR",
            UserType::Admin => "ADMIN",
            UserType::Superadmin => "SUPERADMIN",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(UserType::Normal),
            "INSTRUCTOR" => Ok(UserType::Instructor),
            "ADMIN" => Ok(UserType::Admin),
            "SUPERADMIN" => Ok(UserType::Superadmin),
            _ => Err(()),
        }
    }
}

/// UserSummary
///
/// The user object the Identity Service attaches to successful `me` and `login`
/// responses. This is what the session store holds once a user is logged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserSummary {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_type: UserType,
}

/// Jackson writes unset fields as `null`; read those the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credentials forwarded to `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RegisterRequest
///
/// Payload forwarded to `POST /api/auth/register`. New accounts are always created
/// as `NORMAL` by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// --- Response Payloads (Output Schemas) ---

/// AuthenticationResponse
///
/// Envelope returned by the Identity Service for `me` and `login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct AuthenticationResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}
