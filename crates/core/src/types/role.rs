//! Account roles and the capabilities they grant.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::validation::ValidationError;

/// Something an authenticated caller may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create reviews; edit or delete one's own reviews.
    ReviewGames,
    /// Create and update games.
    CurateCatalog,
    /// Delete games; edit or delete anyone's reviews.
    ModerateContent,
    /// Update or delete other users and change their roles.
    ManageUsers,
}

/// A role held by a user account.
///
/// The string codes are what token claims and the `users.roles` column
/// carry. Registration grants [`Role::Member`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub const ALL: [Self; 2] = [Self::Member, Self::Admin];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    /// Whether holding this role permits `capability`.
    #[must_use]
    pub const fn grants(self, capability: Capability) -> bool {
        match self {
            Self::Admin => true,
            Self::Member => matches!(
                capability,
                Capability::ReviewGames | Capability::CurateCatalog
            ),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "role",
                value: s.to_owned(),
            })
    }
}
