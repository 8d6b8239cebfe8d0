use bson::DateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::new_id;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Manager,
    Admin,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub id: String,
    #[schema(example = "home")]
    pub alias: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

/// Account profile. Credentials live with the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub wishlist: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: new_id(),
            name: name.into(),
            email: email.into(),
            phone: None,
            role: Role::User,
            active: true,
            wishlist: Vec::new(),
            addresses: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

entity!(User, "users", flags = ["active"]);
