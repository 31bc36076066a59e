//! Wire message types for the line-oriented request protocol
//!
//! One JSON object per line, tagged by an `action` field on requests and
//! notifications. Acknowledgments carry a `status` field instead.

use serde::{Deserialize, Serialize};

use crate::storage::Account;

/// Client-to-server request types, parsed once at the codec boundary.
/// Field presence is validated by the dispatcher, not by serde, so a
/// request with missing fields still reaches the state machine and gets
/// a proper error response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action")]
pub enum ClientRequest {
    /// Create an account
    #[serde(rename = "register")]
    Register {
        #[serde(default)]
        country: String,
        #[serde(default)]
        phone: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },

    /// Authenticate by username or phone number
    #[serde(rename = "login")]
    Login {
        #[serde(default, alias = "phone", alias = "username")]
        identifier: String,
        #[serde(default)]
        password: String,
    },

    /// Ask for the current presence snapshot
    #[serde(rename = "get_online_users")]
    GetOnlineUsers,

    /// Send a private message to a named recipient
    #[serde(rename = "send_message")]
    SendMessage {
        #[serde(default)]
        from: String,
        #[serde(default)]
        to: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// List all registered accounts
    #[serde(rename = "view_users")]
    ViewUsers,

    /// Delete an account, force-closing its session if live
    #[serde(rename = "delete_user")]
    DeleteUser {
        #[serde(default)]
        username: String,
    },

    /// End the current session and close the connection
    #[serde(rename = "logout")]
    Logout {
        #[serde(default)]
        username: String,
    },

    /// Any other action tag on otherwise well-formed input
    #[serde(other)]
    Unknown,
}

/// Acknowledgment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Server-to-client message types. Serialized only; each variant matches
/// one of the wire shapes the protocol defines.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Generic request acknowledgment; `username` is present only on a
    /// successful login
    Ack {
        status: Status,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },

    /// Response to `get_online_users`
    OnlineUsers { status: Status, users: Vec<String> },

    /// Response to `view_users`
    AccountList { status: Status, users: Vec<Account> },

    /// Presence notification pushed to every registered connection
    UpdateUsers {
        action: &'static str,
        users: Vec<String>,
    },

    /// Message delivery notification
    ReceiveMessage {
        action: &'static str,
        from: String,
        message: String,
        timestamp: String,
    },
}

impl ServerMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Ack {
            status: Status::Success,
            message: message.into(),
            username: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Ack {
            status: Status::Error,
            message: message.into(),
            username: None,
        }
    }

    pub fn login_success(message: impl Into<String>, username: impl Into<String>) -> Self {
        Self::Ack {
            status: Status::Success,
            message: message.into(),
            username: Some(username.into()),
        }
    }

    pub fn online_users(users: Vec<String>) -> Self {
        Self::OnlineUsers {
            status: Status::Success,
            users,
        }
    }

    pub fn account_list(users: Vec<Account>) -> Self {
        Self::AccountList {
            status: Status::Success,
            users,
        }
    }

    pub fn update_users(users: Vec<String>) -> Self {
        Self::UpdateUsers {
            action: "update_users",
            users,
        }
    }

    pub fn receive_message(
        from: impl Into<String>,
        message: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self::ReceiveMessage {
            action: "receive_message",
            from: from.into(),
            message: message.into(),
            timestamp: timestamp.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_by_action_tag() {
        let req: ClientRequest =
            serde_json::from_str(r#"{"action":"login","identifier":"alice","password":"pw1"}"#)
                .unwrap();
        match req {
            ClientRequest::Login {
                identifier,
                password,
            } => {
                assert_eq!(identifier, "alice");
                assert_eq!(password, "pw1");
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_login_accepts_phone_or_username_field() {
        let req: ClientRequest =
            serde_json::from_str(r#"{"action":"login","phone":"+1555","password":"pw1"}"#).unwrap();
        match req {
            ClientRequest::Login { identifier, .. } => assert_eq!(identifier, "+1555"),
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let req: ClientRequest = serde_json::from_str(r#"{"action":"register"}"#).unwrap();
        match req {
            ClientRequest::Register {
                country,
                phone,
                username,
                password,
            } => {
                assert!(country.is_empty());
                assert!(phone.is_empty());
                assert!(username.is_empty());
                assert!(password.is_empty());
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_action_becomes_unknown() {
        let req: ClientRequest =
            serde_json::from_str(r#"{"action":"make_coffee","sugar":true}"#).unwrap();
        assert!(matches!(req, ClientRequest::Unknown));
    }

    #[test]
    fn test_ack_serializes_without_username_when_absent() {
        let json = serde_json::to_string(&ServerMessage::success("Registered successfully")).unwrap();
        assert_eq!(
            json,
            r#"{"status":"success","message":"Registered successfully"}"#
        );
    }

    #[test]
    fn test_login_ack_carries_canonical_username() {
        let json =
            serde_json::to_string(&ServerMessage::login_success("Login successful", "alice"))
                .unwrap();
        assert_eq!(
            json,
            r#"{"status":"success","message":"Login successful","username":"alice"}"#
        );
    }

    #[test]
    fn test_notifications_carry_action_tag() {
        let json = serde_json::to_string(&ServerMessage::update_users(vec!["alice".to_string()]))
            .unwrap();
        assert_eq!(json, r#"{"action":"update_users","users":["alice"]}"#);

        let json =
            serde_json::to_string(&ServerMessage::receive_message("bob", "hi", "09:15 PM")).unwrap();
        assert_eq!(
            json,
            r#"{"action":"receive_message","from":"bob","message":"hi","timestamp":"09:15 PM"}"#
        );
    }
}
