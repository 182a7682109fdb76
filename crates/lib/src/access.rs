//! # Access Control
//!
//! The debug-user credential table and the per-table access rules. Both are
//! plain data with built-in defaults so deployments can swap them from
//! configuration.
//!
//! Passwords are compared as plain text. This is a deliberately weak scheme
//! inherited from the deployment this service fronts: the credentials gate a
//! diagnostic view, not the database itself, which is protected by its own
//! read-only account.

use crate::session::{AuthState, Session};
use serde::Deserialize;
use std::collections::HashMap;

/// One entry of the debug-user credential table, keyed by lowercase full name.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCredential {
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
}

/// An access rule for one table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRule {
    /// When set, the session must be authenticated and its identity listed in
    /// `allowed_users`.
    #[serde(default)]
    pub requires_auth: bool,
    /// Full names permitted to read the table.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    pub denial_message: String,
}

/// The result of a table access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAccess {
    pub allowed: bool,
    pub denial_message: Option<String>,
}

impl TableAccess {
    fn open() -> Self {
        Self {
            allowed: true,
            denial_message: None,
        }
    }
}

/// Per-table and per-user authorization policy.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessPolicy {
    /// Lowercase full name -> credential.
    #[serde(default)]
    pub users: HashMap<String, UserCredential>,
    /// Table name -> rule. Tables with no rule are open by default.
    #[serde(default)]
    pub table_rules: HashMap<String, TableRule>,
}

impl AccessPolicy {
    /// Looks up a credential by lowercase full name.
    pub fn user(&self, key: &str) -> Option<&UserCredential> {
        self.users.get(&key.to_lowercase())
    }

    /// Detects an identity claim of the form `saya <registered full name>`.
    ///
    /// Returns the matching credential key when the message contains the
    /// literal phrase for any registered user.
    pub fn find_identity_claim(&self, message: &str) -> Option<&str> {
        let lower = message.to_lowercase();
        self.users
            .keys()
            .find(|name| lower.contains(&format!("saya {name}")))
            .map(String::as_str)
    }

    /// Checks whether this session may read the named table.
    ///
    /// Unruled tables are open. A ruled table requires an authenticated
    /// session whose identity appears in the rule's allow-list; failing
    /// either yields the rule's canned denial message.
    pub fn check_table_access(&self, table_name: &str, session: &Session) -> TableAccess {
        let Some(rule) = self.table_rules.get(table_name) else {
            return TableAccess::open();
        };
        if !rule.requires_auth {
            return TableAccess::open();
        }

        let authenticated = session.auth_state == AuthState::Authenticated;
        let listed = session
            .user_name
            .as_deref()
            .map(|name| rule.allowed_users.iter().any(|u| u == name))
            .unwrap_or(false);

        if authenticated && listed {
            TableAccess::open()
        } else {
            TableAccess {
                allowed: false,
                denial_message: Some(rule.denial_message.clone()),
            }
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        let users: [(&str, &str, &str, &str, &str); 3] = [
            (
                "nur iswanto",
                "5553",
                "Nur Iswanto",
                "nur.iswanto@cladtek.com",
                "Admin",
            ),
            (
                "fernando siboro",
                "4106",
                "Fernando Siboro",
                "fernando.siboro@cladtek.com",
                "Manager",
            ),
            ("ah muh rojab", "4127", "Ah muh Rojab", "rojab@cladtek.com", "Staff"),
        ];

        let mut table_rules = HashMap::new();
        table_rules.insert(
            "employees".to_string(),
            TableRule {
                requires_auth: true,
                allowed_users: vec!["Nur Iswanto".to_string(), "Fernando Siboro".to_string()],
                denial_message: "Anda tidak memiliki akses untuk melihat data karyawan. \
                                 Hanya user tertentu yang dapat mengakses informasi ini."
                    .to_string(),
            },
        );

        Self {
            users: users
                .iter()
                .map(|(key, password, full_name, email, role)| {
                    (
                        key.to_string(),
                        UserCredential {
                            password: password.to_string(),
                            full_name: full_name.to_string(),
                            email: email.to_string(),
                            role: role.to_string(),
                        },
                    )
                })
                .collect(),
            table_rules,
        }
    }
}
