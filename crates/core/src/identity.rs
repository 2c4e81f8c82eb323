//! Boundary contract with the auth/role collaborator.
//!
//! Identity resolution happens upstream; the orchestrator trusts this
//! context and only checks `is_admin` and participant-identity equality.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: String,
    pub company_id: String,
    pub role: String,
    pub is_admin: bool,
}

impl RequestContext {
    pub fn admin(user_id: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            company_id: company_id.into(),
            role: "admin".to_string(),
            is_admin: true,
        }
    }

    pub fn employee(user_id: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            company_id: company_id.into(),
            role: "employee".to_string(),
            is_admin: false,
        }
    }
}
