use reqwest::Client;
use satchel_common::errors::SatchelError;
use serde::Deserialize;
use std::env;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Claims echoed back by Google's tokeninfo endpoint. Everything arrives as
/// a string, including booleans.
#[derive(Debug, Deserialize, Clone)]
pub struct GoogleClaims {
    pub sub: String,
    pub email: String,
    pub aud: String,
    pub email_verified: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Validates Google ID tokens sent by the SPA's sign-in button.
pub struct GoogleVerifier {
    http: Client,
    client_id: String,
    endpoint: String,
}

impl GoogleVerifier {
    pub fn from_env() -> Self {
        Self::new(env::var("GOOGLE_CLIENT_ID").unwrap_or_default())
    }

    pub fn new(client_id: String) -> Self {
        Self {
            http: Client::new(),
            client_id,
            endpoint: String::from(TOKENINFO_URL),
        }
    }

    /**
     * Verify an ID token against the tokeninfo endpoint
     *
     * @param id_token - the credential string from Google sign-in
     * @return claims on success; GoogleAuth if the token is rejected, minted
     *         for another client id, or the email is unverified
     */
    pub async fn verify(&self, id_token: &str) -> Result<GoogleClaims, SatchelError> {
        if self.client_id.is_empty() {
            return Err(SatchelError::GoogleAuth(String::from(
                "GOOGLE_CLIENT_ID is not configured",
            )));
        }
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| SatchelError::GoogleAuth(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SatchelError::GoogleAuth(String::from(
                "token rejected by Google",
            )));
        }
        let claims: GoogleClaims = response
            .json()
            .await
            .map_err(|e| SatchelError::GoogleAuth(format!("unexpected tokeninfo body: {}", e)))?;
        if claims.aud != self.client_id {
            return Err(SatchelError::GoogleAuth(String::from(
                "token was issued for a different client",
            )));
        }
        if claims.email_verified.as_deref() != Some("true") {
            return Err(SatchelError::GoogleAuth(String::from(
                "Google account email is not verified",
            )));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_deserialize_from_tokeninfo_shape() {
        let body = r#"{
            "iss": "https://accounts.google.com",
            "sub": "110169484474386276334",
            "aud": "client-id.apps.googleusercontent.com",
            "email": "ada@example.com",
            "email_verified": "true",
            "name": "Ada Lovelace",
            "picture": "https://lh3.googleusercontent.com/a/photo",
            "exp": "1714000000"
        }"#;
        let claims: GoogleClaims = serde_json::from_str(body).unwrap();
        assert_eq!(claims.sub, "110169484474386276334");
        assert_eq!(claims.email_verified.as_deref(), Some("true"));
        assert_eq!(claims.name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_claims_tolerate_missing_optionals() {
        let body = r#"{
            "sub": "1",
            "aud": "client-id",
            "email": "ada@example.com"
        }"#;
        let claims: GoogleClaims = serde_json::from_str(body).unwrap();
        assert!(claims.email_verified.is_none());
        assert!(claims.picture.is_none());
    }
}
