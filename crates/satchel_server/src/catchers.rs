use rocket::request::Request;
use rocket::serde::json::Json;
use satchel_common::errors::SatchelError;
use satchel_common::http::responses::MessageResponse;

// Every non-2xx response carries a `{ "message": ... }` JSON body, whether it
// comes from a handler or from a catcher.
#[derive(Responder)]
pub enum ApiResponse {
    #[response(status = 400)]
    BadRequest(Json<MessageResponse>),
    #[response(status = 401)]
    Unauthorized(Json<MessageResponse>),
    #[response(status = 404)]
    NotFound(Json<MessageResponse>),
    #[response(status = 500)]
    InternalError(Json<MessageResponse>),
}

impl From<SatchelError> for ApiResponse {
    fn from(err: SatchelError) -> Self {
        match &err {
            SatchelError::InvalidEmail(_)
            | SatchelError::PasswordTooShort
            | SatchelError::EmailInUse(_)
            | SatchelError::MissingField(_)
            | SatchelError::ResetTokenInvalid => {
                ApiResponse::BadRequest(Json(MessageResponse::new(err.to_string())))
            }
            SatchelError::InvalidCredentials
            | SatchelError::TokenError(_)
            | SatchelError::GoogleAuth(_) => {
                ApiResponse::Unauthorized(Json(MessageResponse::new(err.to_string())))
            }
            SatchelError::UserNotFound(_)
            | SatchelError::SubjectNotFound(_)
            | SatchelError::EntityNotFound(_, _) => {
                ApiResponse::NotFound(Json(MessageResponse::new(err.to_string())))
            }
            SatchelError::MongoError(_)
            | SatchelError::MailError(_)
            | SatchelError::ChatbotError(_)
            | SatchelError::SerdeError(_)
            | SatchelError::InternalError => {
                // log the detail, return a generic body
                tracing::error!("internal error: {}", err);
                ApiResponse::InternalError(Json(MessageResponse::new("Something went wrong")))
            }
        }
    }
}

pub struct ErrorMessage(pub Option<String>);

#[catch(400)]
pub fn bad_request(req: &Request) -> ApiResponse {
    match req.local_cache(|| ErrorMessage(None)) {
        ErrorMessage(Some(msg)) => ApiResponse::BadRequest(Json(MessageResponse::new(msg))),
        ErrorMessage(None) => ApiResponse::BadRequest(Json(MessageResponse::new("Bad request"))),
    }
}

#[catch(401)]
pub fn unauthorized(req: &Request) -> ApiResponse {
    match req.local_cache(|| ErrorMessage(None)) {
        ErrorMessage(Some(msg)) => ApiResponse::Unauthorized(Json(MessageResponse::new(msg))),
        ErrorMessage(None) => {
            ApiResponse::Unauthorized(Json(MessageResponse::new("Not authorized")))
        }
    }
}

#[catch(404)]
pub fn not_found(req: &Request) -> ApiResponse {
    match req.local_cache(|| ErrorMessage(None)) {
        ErrorMessage(Some(msg)) => ApiResponse::NotFound(Json(MessageResponse::new(msg))),
        ErrorMessage(None) => ApiResponse::NotFound(Json(MessageResponse::new("Route not found"))),
    }
}

// Rocket reports undeserializable JSON bodies as 422; the SPA only knows the
// Express-era contract, so fold those into 400.
#[catch(422)]
pub fn unprocessable(_req: &Request) -> ApiResponse {
    ApiResponse::BadRequest(Json(MessageResponse::new("Malformed JSON body")))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> ApiResponse {
    ApiResponse::InternalError(Json(MessageResponse::new("Something went wrong")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_of(response: &ApiResponse) -> &str {
        match response {
            ApiResponse::BadRequest(body)
            | ApiResponse::Unauthorized(body)
            | ApiResponse::NotFound(body)
            | ApiResponse::InternalError(body) => &body.message,
        }
    }

    #[test]
    fn test_validation_errors_map_to_400() {
        let response = ApiResponse::from(SatchelError::PasswordTooShort);
        assert!(matches!(response, ApiResponse::BadRequest(_)));
        let response = ApiResponse::from(SatchelError::EmailInUse(String::from("a@b.co")));
        assert!(matches!(response, ApiResponse::BadRequest(_)));
        let response = ApiResponse::from(SatchelError::ResetTokenInvalid);
        assert!(matches!(response, ApiResponse::BadRequest(_)));
    }

    #[test]
    fn test_auth_errors_map_to_401() {
        let response = ApiResponse::from(SatchelError::InvalidCredentials);
        assert!(matches!(response, ApiResponse::Unauthorized(_)));
        let response = ApiResponse::from(SatchelError::TokenError(String::from("expired")));
        assert!(matches!(response, ApiResponse::Unauthorized(_)));
    }

    #[test]
    fn test_lookup_errors_map_to_404() {
        let response = ApiResponse::from(SatchelError::SubjectNotFound(String::from("abc")));
        assert!(matches!(response, ApiResponse::NotFound(_)));
        let response = ApiResponse::from(SatchelError::EntityNotFound(
            String::from("lecture"),
            String::from("l1"),
        ));
        assert!(matches!(response, ApiResponse::NotFound(_)));
        assert_eq!(message_of(&response), "No lecture found with id l1");
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let response = ApiResponse::from(SatchelError::MongoError(String::from(
            "connection pool exhausted at 10.0.0.3",
        )));
        assert!(matches!(response, ApiResponse::InternalError(_)));
        assert_eq!(message_of(&response), "Something went wrong");
    }
}
