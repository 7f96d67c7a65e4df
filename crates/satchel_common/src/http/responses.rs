use crate::models::User;
use serde::{Deserialize, Serialize};

// Public view of an account. Credential and reset fields never leave the
// server; responses go through this type instead of the raw document.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    pub id: String,
    pub is_favorite: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotResponse {
    pub answer: String,
    pub model_used: String,
    /// Wall-clock milliseconds spent answering, upstream time included.
    pub processing_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn test_user_response_hides_credentials() {
        let user = User {
            id: Some(ObjectId::new()),
            name: String::from("Ada"),
            email: String::from("ada@example.com"),
            password: Some(String::from("$2b$12$hash")),
            google_id: None,
            profile_picture: None,
            password_reset_token: Some(String::from("deadbeef")),
            password_reset_expires: None,
            created_at: None,
        };
        let response = UserResponse::from(&user);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert!(json.get("password").is_none());
        assert!(json.get("passwordResetToken").is_none());
    }
}
