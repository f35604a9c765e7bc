//! Row types shared by the data modules and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::data::ids::{ApplicationId, InvitationId, MessageId, RoomId, UserId};

/// A registered account. The password hash is never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub admin_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A room member as shown in room detail responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Member {
    pub id: UserId,
    pub username: String,
}

/// An admin's offer for a user to join a room.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: InvitationId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A user's request to join a room, pending the admin's decision.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Direction of a wallet ledger entry, stored as a `SMALLINT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    /// Funds added by a top-up.
    Charge = 0,
    /// Funds spent on a purchase.
    Cost = 1,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletLogEntry {
    pub kind: LedgerKind,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_never_serializes() {
        let user = User {
            id: UserId::new(1),
            username: "june".into(),
            password_hash: "$2b$12$secret".into(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"username\":\"june\""));
    }

    #[test]
    fn ledger_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LedgerKind::Charge).unwrap(), "\"charge\"");
        assert_eq!(serde_json::to_string(&LedgerKind::Cost).unwrap(), "\"cost\"");
    }
}
