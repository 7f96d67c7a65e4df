use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SatchelError {
    InvalidEmail(String),
    PasswordTooShort,
    EmailInUse(String),
    UserNotFound(String),
    InvalidCredentials,
    TokenError(String),
    ResetTokenInvalid,
    GoogleAuth(String),
    SubjectNotFound(String),
    EntityNotFound(String, String),
    MissingField(String),
    MongoError(String),
    MailError(String),
    ChatbotError(String),
    SerdeError(String),
    InternalError,
}

impl std::fmt::Display for SatchelError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SatchelError::InvalidEmail(msg) => write!(f, "Email {} is not a valid address", msg),
            SatchelError::PasswordTooShort => write!(
                f,
                "Password must be at least {} characters",
                crate::MIN_PASSWORD_CHARS
            ),
            SatchelError::EmailInUse(msg) => {
                write!(f, "Email {} already used by another account", msg)
            }
            SatchelError::UserNotFound(msg) => write!(f, "No account found for {}", msg),
            SatchelError::InvalidCredentials => write!(f, "Invalid email or password"),
            SatchelError::TokenError(msg) => write!(f, "Authorization error: {}", msg),
            SatchelError::ResetTokenInvalid => {
                write!(f, "Password reset token is invalid or has expired")
            }
            SatchelError::GoogleAuth(msg) => write!(f, "Google sign-in failed: {}", msg),
            SatchelError::SubjectNotFound(msg) => write!(f, "Subject {} does not exist", msg),
            SatchelError::EntityNotFound(kind, id) => {
                write!(f, "No {} found with id {}", kind, id)
            }
            SatchelError::MissingField(msg) => write!(f, "Missing required field `{}`", msg),
            SatchelError::MongoError(msg) => write!(f, "Mongo error: {}", msg),
            SatchelError::MailError(msg) => write!(f, "Mail error: {}", msg),
            SatchelError::ChatbotError(msg) => write!(f, "Chatbot error: {}", msg),
            SatchelError::SerdeError(msg) => write!(f, "Error serializing {}", msg),
            SatchelError::InternalError => write!(f, "Unknown internal server error"),
        }
    }
}

impl std::error::Error for SatchelError {}
