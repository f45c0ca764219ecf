//! Authenticated identity types.

use serde::{Deserialize, Serialize};

/// Stable user identifier assigned by the server.
pub type UserId = u64;

/// Role of an authenticated user.
///
/// Serialized with the server's wire spelling (`SHOP_OWNER`, `DELIVERY_BOY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Platform administrator.
    Admin,
    /// Retailer placing orders.
    Retailer,
    /// Shop owner fulfilling orders.
    ShopOwner,
    /// Delivery courier.
    DeliveryBoy,
}

/// Server-verified user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user ID; also the connection parameter for the realtime
    /// channel.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
}

/// Opaque bearer credential.
///
/// # Security
///
/// - **Debug redaction**: the `Debug` impl never prints the credential
///   itself, only its length, so tokens cannot leak through logging.
/// - **No `Serialize`**: the durable profile snapshot carries the user
///   subset only. `Token` deliberately does not implement `Serialize`, so
///   it cannot end up in the snapshot by accident; durability for tokens
///   goes through the [`TokenVault`](crate::TokenVault) contract instead.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw bearer credential.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw credential, for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token(<redacted {} bytes>)", self.0.len())
    }
}
