use crate::catchers::ErrorMessage;
use crate::mongo::SatchelDB;
use crate::utils;
use bson::oid::ObjectId;
use rocket::{
    http::Status,
    outcome::Outcome::{Error as Failure, Success},
    request::{FromRequest, Outcome, Request},
    State,
};
use std::str::FromStr;

/// Proof that the request carried a valid `Bearer` token for an account that
/// still exists. Routes take this guard as an argument to require login.
pub struct AuthenticatedUser {
    pub id: ObjectId,
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let db = match request.guard::<&State<SatchelDB>>().await {
            Success(db) => db,
            _ => {
                request.local_cache(|| ErrorMessage(Some(String::from("Server state missing"))));
                return Failure((Status::InternalServerError, ()));
            }
        };
        let auth_header = match request.headers().get_one("Authorization") {
            Some(auth_header) => auth_header,
            None => {
                let err_msg = String::from("Missing authorization header");
                request.local_cache(|| ErrorMessage(Some(err_msg)));
                return Failure((Status::Unauthorized, ()));
            }
        };
        let token = match auth_header.strip_prefix("Bearer ") {
            Some(token) => token.trim(),
            None => {
                let err_msg = String::from("Malformed authorization header");
                request.local_cache(|| ErrorMessage(Some(err_msg)));
                return Failure((Status::BadRequest, ()));
            }
        };
        let claims = match utils::decode_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                request.local_cache(|| ErrorMessage(Some(e.to_string())));
                return Failure((Status::Unauthorized, ()));
            }
        };
        let user_id = match ObjectId::from_str(&claims.id) {
            Ok(user_id) => user_id,
            Err(_) => {
                let err_msg = String::from("Malformed account id in token");
                request.local_cache(|| ErrorMessage(Some(err_msg)));
                return Failure((Status::Unauthorized, ()));
            }
        };
        // tokens outlive accounts; make sure this one still resolves
        match db.get_user_by_id(&user_id).await {
            Ok(Some(user)) => Success(AuthenticatedUser {
                id: user_id,
                email: user.email,
            }),
            Ok(None) => {
                let err_msg = format!("Account for {} no longer exists", claims.email);
                request.local_cache(|| ErrorMessage(Some(err_msg)));
                Failure((Status::Unauthorized, ()))
            }
            Err(e) => {
                request.local_cache(|| ErrorMessage(Some(e.to_string())));
                Failure((Status::InternalServerError, ()))
            }
        }
    }
}
