use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Validated email address (`local@domain`).
///
/// Guaranteed well-formed by construction. The domain part is stored lowercased
/// so allowed-domain checks and cache lookups compare consistently.
/// Use `"ana@school.edu".parse::<Email>()` or `Email::try_from(string)` to create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Domain part, lowercased.
    #[must_use]
    pub fn domain(&self) -> &str {
        // Constructor guarantees exactly one '@'
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for Email {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(Error::InvalidEmail(s));
        };
        let valid = !local.is_empty()
            && !domain.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !trimmed.chars().any(char::is_whitespace);
        if valid {
            Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
        } else {
            Err(Error::InvalidEmail(s))
        }
    }
}

impl From<Email> for String {
    fn from(e: Email) -> Self {
        e.0
    }
}

/// Application role held by a profile.
///
/// The profile table historically stored `"profesor"` for ordinary teachers;
/// it decodes as [`Role::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "profesor")]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role grants what `required` asks for. Admins satisfy every requirement.
    #[must_use]
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => self.is_admin(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Admin => "admin",
        })
    }
}

/// The application's own record of a person, keyed by email.
///
/// Field names on the wire follow the remote `usuarios` table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Profile {
    pub email: Email,
    #[serde(rename = "nombre")]
    pub display_name: String,
    #[serde(rename = "rol", default)]
    pub role: Role,
    #[serde(rename = "activo", default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Profile {
    /// Create an active profile.
    #[must_use]
    pub fn new(email: Email, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            email,
            display_name: display_name.into(),
            role,
            active: true,
        }
    }

    /// Default profile created the first time an authenticated email is seen.
    ///
    /// Always an active ordinary user; provisioning never grants admin.
    #[must_use]
    pub fn provisioned(email: Email, display_name: Option<&str>) -> Self {
        let name = display_name
            .filter(|n| !n.trim().is_empty())
            .map_or_else(|| email.to_string(), str::to_owned);
        Self::new(email, name, Role::User)
    }

    /// Set the active flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Provider-issued user identifier (the JWT `sub` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct ProviderUserId(pub String);
