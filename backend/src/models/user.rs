//! Models that represent dashboard accounts and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a dashboard account.
pub struct User {
    /// Unique identifier for the user.
    pub id: UserId,
    /// Email address used for login and display.
    pub email: String,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    /// Role describing the user's privileges.
    pub role: UserRole,
    /// Suspended accounts cannot authenticate.
    pub disabled: bool,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported account roles stored in the database.
pub enum UserRole {
    /// Standard member with access to the home screen and profile.
    #[default]
    User,
    /// Administrator with access to the log viewers.
    Admin,
    /// Highest tier; may also manage accounts.
    SuperAdmin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            // primary canonical values (snake_case)
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "super_admin" => Ok(UserRole::SuperAdmin),
            // tolerate common legacy casings
            "User" | "USER" => Ok(UserRole::User),
            "Admin" | "ADMIN" => Ok(UserRole::Admin),
            "SuperAdmin" | "SUPER_ADMIN" | "superadmin" => Ok(UserRole::SuperAdmin),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["user", "admin", "super_admin"],
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Authentication token returned after a successful login.
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
/// Public-facing representation of an account returned by the API.
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.to_string(),
            email: user.email,
            role: user.role.as_str().to_string(),
            disabled: user.disabled,
            created_at: user.created_at,
        }
    }
}

impl User {
    /// Constructs a new account with freshly generated identifiers.
    pub fn new(email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            password_hash,
            role,
            disabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when the user may view the admin log panels.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::SuperAdmin)
    }

    /// Returns `true` when the user may manage accounts.
    pub fn is_super_admin(&self) -> bool {
        matches!(self.role, UserRole::SuperAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn user_role_serde_accepts_and_emits_snake_case() {
        let u: UserRole = serde_json::from_str("\"user\"").unwrap();
        let a: UserRole = serde_json::from_str("\"admin\"").unwrap();
        let s: UserRole = serde_json::from_str("\"super_admin\"").unwrap();
        assert!(matches!(u, UserRole::User));
        assert!(matches!(a, UserRole::Admin));
        assert!(matches!(s, UserRole::SuperAdmin));

        // Tolerate legacy casings
        let a2: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert!(matches!(a2, UserRole::Admin));

        let sa = serde_json::to_value(UserRole::SuperAdmin).unwrap();
        assert_eq!(sa, Value::String("super_admin".into()));
    }

    #[test]
    fn role_privileges_are_ordered() {
        let member = User::new("m@example.com".into(), "hash".into(), UserRole::User);
        let admin = User::new("a@example.com".into(), "hash".into(), UserRole::Admin);
        let root = User::new("r@example.com".into(), "hash".into(), UserRole::SuperAdmin);

        assert!(!member.is_admin());
        assert!(admin.is_admin() && !admin.is_super_admin());
        assert!(root.is_admin() && root.is_super_admin());
    }

    #[test]
    fn user_response_hides_password_hash() {
        let user = User::new("x@example.com".into(), "hash".into(), UserRole::Admin);
        let resp: UserResponse = user.into();
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }
}
