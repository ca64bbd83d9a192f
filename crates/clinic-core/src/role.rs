//! # Roles and Capabilities
//!
//! Every endpoint asks for exactly one [`Capability`]. Which roles hold which
//! capabilities is decided here and nowhere else.
//!
//! ```text
//! ┌───────────────┬─────────┬────────┬────────┬───────┬────────┬───────┐
//! │ role          │ view    │ orders │ stock  │ issue │ return │ users │
//! ├───────────────┼─────────┼────────┼────────┼───────┼────────┼───────┤
//! │ admin         │   ✓     │   ✓    │   ✓    │   ✓   │   ✓    │   ✓   │
//! │ optical       │   ✓     │   ✓    │   ✓    │   ✓   │   ✓    │       │
//! │ pharmacy      │   ✓     │   ✓    │   ✓    │   ✓   │   ✓    │       │
//! │ laboratory    │   ✓     │        │   ✓    │   ✓   │        │       │
//! │ ophthalmology │   ✓     │   ✓    │        │       │        │       │
//! │ finance       │   ✓     │   ✓    │        │       │        │       │
//! └───────────────┴─────────┴────────┴────────┴───────┴────────┴───────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Staff role carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Laboratory,
    Pharmacy,
    Optical,
    Ophthalmology,
    Finance,
}

/// Something an endpoint needs the caller to be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewOrders,
    ManageOrders,
    ManageStock,
    IssueStock,
    ReturnStock,
    ManageUsers,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Laboratory,
        Role::Pharmacy,
        Role::Optical,
        Role::Ophthalmology,
        Role::Finance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Laboratory => "laboratory",
            Role::Pharmacy => "pharmacy",
            Role::Optical => "optical",
            Role::Ophthalmology => "ophthalmology",
            Role::Finance => "finance",
        }
    }

    /// The fixed capability set for this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Admin => &[
                ViewOrders,
                ManageOrders,
                ManageStock,
                IssueStock,
                ReturnStock,
                ManageUsers,
            ],
            Role::Optical | Role::Pharmacy => &[
                ViewOrders,
                ManageOrders,
                ManageStock,
                IssueStock,
                ReturnStock,
            ],
            Role::Laboratory => &[ViewOrders, ManageStock, IssueStock],
            Role::Ophthalmology | Role::Finance => &[ViewOrders, ManageOrders],
        }
    }

    #[inline]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.to_string()).collect(),
            })
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ViewOrders => "view_orders",
            Capability::ManageOrders => "manage_orders",
            Capability::ManageStock => "manage_stock",
            Capability::IssueStock => "issue_stock",
            Capability::ReturnStock => "return_stock",
            Capability::ManageUsers => "manage_users",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        for cap in [
            Capability::ViewOrders,
            Capability::ManageOrders,
            Capability::ManageStock,
            Capability::IssueStock,
            Capability::ReturnStock,
            Capability::ManageUsers,
        ] {
            assert!(Role::Admin.has(cap), "admin lacks {cap}");
        }
    }

    #[test]
    fn test_only_admin_manages_users() {
        for role in Role::ALL {
            assert_eq!(role.has(Capability::ManageUsers), role == Role::Admin);
        }
    }

    #[test]
    fn test_finance_cannot_touch_stock() {
        assert!(!Role::Finance.has(Capability::IssueStock));
        assert!(!Role::Finance.has(Capability::ReturnStock));
        assert!(Role::Finance.has(Capability::ViewOrders));
    }

    #[test]
    fn test_every_role_can_view() {
        assert!(Role::ALL.iter().all(|r| r.has(Capability::ViewOrders)));
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("Optical".parse::<Role>().unwrap(), Role::Optical);
        assert!("janitor".parse::<Role>().is_err());
    }
}
