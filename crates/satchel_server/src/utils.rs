use crate::{JWT_EXPIRES_IN, JWT_SECRET};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use satchel_common::errors::SatchelError;
use satchel_common::RESET_TOKEN_BYTES;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Fallback session lifetime when JWT_EXPIRES_IN is unset or unparseable.
pub const DEFAULT_SESSION_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub exp: u64,
}

/**
 * Signs a session token for the given account
 *
 * @param id - hex string of the account's ObjectId
 * @param email - the account email, embedded so guards can report who the
 *                token belonged to after the account is deleted
 * @return the signed HS256 token, or TokenError if signing fails
 */
pub fn issue_token(id: &str, email: &str) -> Result<String, SatchelError> {
    let claims = Claims {
        id: String::from(id),
        email: String::from(email),
        exp: now_secs() + parse_expiry(&JWT_EXPIRES_IN),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .map_err(|e| SatchelError::TokenError(e.to_string()))
}

pub fn decode_token(token: &str) -> Result<Claims, SatchelError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| SatchelError::TokenError(e.to_string()))
}

/**
 * Parses lifetimes written like "7d", "12h", "30m", "90s", or a bare number
 * of seconds. Anything unparseable falls back to DEFAULT_SESSION_SECS.
 */
pub fn parse_expiry(lifetime: &str) -> u64 {
    let lifetime = lifetime.trim();
    let (number, multiplier) = if let Some(number) = lifetime.strip_suffix('d') {
        (number, 86_400)
    } else if let Some(number) = lifetime.strip_suffix('h') {
        (number, 3_600)
    } else if let Some(number) = lifetime.strip_suffix('m') {
        (number, 60)
    } else if let Some(number) = lifetime.strip_suffix('s') {
        (number, 1)
    } else {
        (lifetime, 1)
    };
    match number.trim().parse::<u64>() {
        Ok(value) if value > 0 => value * multiplier,
        _ => DEFAULT_SESSION_SECS,
    }
}

/**
 * Mints a password reset token pair: the raw hex token that goes into the
 * emailed link, and the sha256 digest that gets persisted. Only the digest
 * ever touches the database, so a leaked user document cannot be replayed
 * into a reset.
 *
 * @return (raw token, sha256 of raw token)
 */
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    let hashed = hash_token(&raw);
    (raw, hashed)
}

pub fn hash_token(raw: &str) -> String {
    sha256::digest(raw)
}

/// Address check applied at registration, HTML5 rules via the validator crate.
pub fn is_valid_email(email: &str) -> bool {
    validator::validate_email(email)
}

/// Current time formatted for the document timestamp fields.
pub fn now_rfc3339() -> String {
    format_timestamp(bson::DateTime::now())
}

/**
 * Fixed-width RFC 3339 with exactly three fractional digits. The driver's
 * formatter trims trailing zeros, and a trimmed string compares below its
 * same-second siblings ("...40.5Z" sorts before "...40Z"), which would break
 * the lexicographic createdAt sort behind the subject list.
 */
fn format_timestamp(date: bson::DateTime) -> String {
    let text = date.try_to_rfc3339_string().unwrap_or_default();
    let body = match text.strip_suffix('Z') {
        Some(body) => body,
        None => return text,
    };
    match body.split_once('.') {
        Some((seconds, fraction)) => format!("{}.{:0<3}Z", seconds, fraction),
        None => format!("{}.000Z", body),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_units() {
        assert_eq!(parse_expiry("7d"), 604_800);
        assert_eq!(parse_expiry("12h"), 43_200);
        assert_eq!(parse_expiry("30m"), 1_800);
        assert_eq!(parse_expiry("90s"), 90);
        assert_eq!(parse_expiry("3600"), 3_600);
        assert_eq!(parse_expiry(" 2d "), 172_800);
    }

    #[test]
    fn test_parse_expiry_falls_back_on_garbage() {
        assert_eq!(parse_expiry(""), DEFAULT_SESSION_SECS);
        assert_eq!(parse_expiry("soon"), DEFAULT_SESSION_SECS);
        assert_eq!(parse_expiry("0d"), DEFAULT_SESSION_SECS);
        assert_eq!(parse_expiry("-5h"), DEFAULT_SESSION_SECS);
    }

    #[test]
    fn test_token_round_trip() {
        let token = issue_token("65f000000000000000000001", "ada@example.com").unwrap();
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.id, "65f000000000000000000001");
        assert_eq!(claims.email, "ada@example.com");
        assert!(claims.exp > now_secs());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = issue_token("65f000000000000000000001", "ada@example.com").unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(decode_token(&tampered).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // sign an already-expired claim set with the same secret
        let claims = Claims {
            id: String::from("65f000000000000000000001"),
            email: String::from("ada@example.com"),
            exp: now_secs() - 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .unwrap();
        assert!(decode_token(&token).is_err());
    }

    #[test]
    fn test_reset_token_shape() {
        let (raw, hashed) = generate_reset_token();
        assert_eq!(raw.len(), RESET_TOKEN_BYTES * 2);
        assert!(raw.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, hash_token(&raw));
        assert_eq!(hashed.len(), 64);
        assert_ne!(raw, hashed);
    }

    #[test]
    fn test_reset_tokens_are_unique() {
        let (a, _) = generate_reset_token();
        let (b, _) = generate_reset_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        // the HTML5 rules accept a bare hostname domain
        assert!(is_valid_email("ada@example"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@example.com."));
        assert!(!is_valid_email("user@mail..example.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email("ada@exa mple.com"));
    }

    #[test]
    fn test_timestamp_strings_sort_chronologically() {
        let whole = format_timestamp(bson::DateTime::from_millis(1_714_000_000_000));
        let half = format_timestamp(bson::DateTime::from_millis(1_714_000_000_500));
        let tick = format_timestamp(bson::DateTime::from_millis(1_714_000_000_050));
        assert_eq!(whole, "2024-04-24T23:06:40.000Z");
        assert_eq!(half, "2024-04-24T23:06:40.500Z");
        assert_eq!(tick, "2024-04-24T23:06:40.050Z");
        assert!(half > tick);
        assert!(tick > whole);
    }
}
