use crate::catchers::ApiResponse;
use crate::google::GoogleVerifier;
use crate::guards::AuthenticatedUser;
use crate::mailer::Mailer;
use crate::mongo::SatchelDB;
use crate::utils;
use crate::CLIENT_URL;
use bson::DateTime;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use satchel_common::errors::SatchelError;
use satchel_common::http::requests::{
    ForgotPasswordRequest, GoogleAuthRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};
use satchel_common::http::responses::{AuthResponse, MessageResponse, UserResponse};
use satchel_common::models::User;
use satchel_common::{MIN_PASSWORD_CHARS, RESET_TOKEN_TTL_MINUTES};
use tracing::{error, info};

/**
 * Register a new account with name, email, and password
 *
 * @param request - the RegisterRequest containing:
 *             * name: display name for the account
 *             * email: login email, normalized to lowercase
 *             * password: plaintext password, hashed before storage
 * @return status:
 *             * 201 with a session token and the public user on success
 *             * 400 if the email is malformed, the password is under the
 *               minimum length, the name is blank, or the email is taken
 *             * 500 if db or hashing fails
 */
#[post("/register", format = "json", data = "<request>")]
pub async fn register(
    request: Json<RegisterRequest>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<AuthResponse>), ApiResponse> {
    let email = request.email.trim().to_lowercase();
    if !utils::is_valid_email(&email) {
        return Err(SatchelError::InvalidEmail(email).into());
    }
    if request.password.len() < MIN_PASSWORD_CHARS {
        return Err(SatchelError::PasswordTooShort.into());
    }
    let name = request.name.trim();
    if name.is_empty() {
        return Err(SatchelError::MissingField(String::from("name")).into());
    }
    let hashed = match bcrypt::hash(&request.password, bcrypt::DEFAULT_COST) {
        Ok(hashed) => hashed,
        Err(e) => {
            error!("password hashing failed: {}", e);
            return Err(SatchelError::InternalError.into());
        }
    };
    let mut user = User {
        id: None,
        name: String::from(name),
        email: email.clone(),
        password: Some(hashed),
        google_id: None,
        profile_picture: None,
        password_reset_token: None,
        password_reset_expires: None,
        created_at: Some(DateTime::now()),
    };
    let id = db.create_user(&user).await?;
    user.id = Some(id);
    let token = utils::issue_token(&id.to_hex(), &email)?;
    info!("registered new account for {}", email);
    Ok((
        Status::Created,
        Json(AuthResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/**
 * Exchange email + password for a session token
 *
 * @return status:
 *             * 200 with token and public user
 *             * 401 on unknown email, wrong password, or a federated
 *               account with no password set (same message for all three)
 */
#[post("/login", format = "json", data = "<request>")]
pub async fn login(
    request: Json<LoginRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<AuthResponse>, ApiResponse> {
    let email = request.email.trim().to_lowercase();
    let user = match db.get_user_by_email(&email).await? {
        Some(user) => user,
        None => return Err(SatchelError::InvalidCredentials.into()),
    };
    // google-only accounts have no password hash to check against
    let stored = match &user.password {
        Some(stored) => stored,
        None => return Err(SatchelError::InvalidCredentials.into()),
    };
    if !bcrypt::verify(&request.password, stored).unwrap_or(false) {
        return Err(SatchelError::InvalidCredentials.into());
    }
    let id = match user.id {
        Some(id) => id,
        None => return Err(SatchelError::InternalError.into()),
    };
    let token = utils::issue_token(&id.to_hex(), &user.email)?;
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/**
 * Sign in (or sign up) with a Google ID token. First federation onto an
 * existing email links the google id to that account; an unknown email gets
 * a fresh passwordless account.
 *
 * @return status:
 *             * 200 with token and public user
 *             * 401 if Google rejects the token, the audience is wrong, or
 *               the email is unverified
 */
#[post("/google", format = "json", data = "<request>")]
pub async fn google_auth(
    request: Json<GoogleAuthRequest>,
    db: &State<SatchelDB>,
    verifier: &State<GoogleVerifier>,
) -> Result<Json<AuthResponse>, ApiResponse> {
    let claims = verifier.verify(&request.id_token).await?;
    let email = claims.email.trim().to_lowercase();
    let user = match db.get_user_by_email(&email).await? {
        Some(mut user) => {
            if user.google_id.is_none() {
                let id = match user.id {
                    Some(id) => id,
                    None => return Err(SatchelError::InternalError.into()),
                };
                // keep an existing custom picture over the google one
                let picture = match &user.profile_picture {
                    Some(_) => None,
                    None => claims.picture.clone(),
                };
                db.link_google_account(&id, &claims.sub, picture.as_deref())
                    .await?;
                user.google_id = Some(claims.sub.clone());
                if let Some(picture) = picture {
                    user.profile_picture = Some(picture);
                }
                info!("linked google account for {}", email);
            }
            user
        }
        None => {
            let mut user = User {
                id: None,
                name: claims.name.clone().unwrap_or_else(|| email.clone()),
                email: email.clone(),
                password: None,
                google_id: Some(claims.sub.clone()),
                profile_picture: claims.picture.clone(),
                password_reset_token: None,
                password_reset_expires: None,
                created_at: Some(DateTime::now()),
            };
            let id = db.create_user(&user).await?;
            user.id = Some(id);
            info!("created account via google sign-in for {}", email);
            user
        }
    };
    let id = match user.id {
        Some(id) => id,
        None => return Err(SatchelError::InternalError.into()),
    };
    let token = utils::issue_token(&id.to_hex(), &user.email)?;
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/**
 * Start a password reset: mint a token, store its hash with a ttl, and mail
 * the raw token to the account email. If the mail cannot be sent the stored
 * token is cleared again so no orphaned token stays live.
 *
 * @return status:
 *             * 200 with a confirmation message
 *             * 404 if no account matches the email
 *             * 500 if the email fails to send
 */
#[post("/forgot-password", format = "json", data = "<request>")]
pub async fn forgot_password(
    request: Json<ForgotPasswordRequest>,
    db: &State<SatchelDB>,
    mailer: &State<Mailer>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let email = request.email.trim().to_lowercase();
    let user = match db.get_user_by_email(&email).await? {
        Some(user) => user,
        None => return Err(SatchelError::UserNotFound(email).into()),
    };
    let id = match user.id {
        Some(id) => id,
        None => return Err(SatchelError::InternalError.into()),
    };
    let (raw, hashed) = utils::generate_reset_token();
    let expires = DateTime::from_millis(
        DateTime::now().timestamp_millis() + RESET_TOKEN_TTL_MINUTES * 60 * 1000,
    );
    db.set_reset_token(&id, &hashed, expires).await?;
    let reset_url = format!("{}/reset-password/{}", &**CLIENT_URL, raw);
    if let Err(e) = mailer.send_password_reset(&user.email, &reset_url).await {
        db.clear_reset_token(&id).await?;
        return Err(e.into());
    }
    Ok(Json(MessageResponse::new(
        "Password reset link sent to your email",
    )))
}

/**
 * Finish a password reset using the raw token from the emailed link
 *
 * @return status:
 *             * 200 once the password is replaced and the token burned
 *             * 400 if the token is unknown, already used, or expired, or
 *               the new password is under the minimum length
 */
#[post("/reset-password/<token>", format = "json", data = "<request>")]
pub async fn reset_password(
    token: &str,
    request: Json<ResetPasswordRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    if request.password.len() < MIN_PASSWORD_CHARS {
        return Err(SatchelError::PasswordTooShort.into());
    }
    let hashed_token = utils::hash_token(token);
    let user = match db.get_user_by_reset_token(&hashed_token).await? {
        Some(user) => user,
        None => return Err(SatchelError::ResetTokenInvalid.into()),
    };
    let id = match user.id {
        Some(id) => id,
        None => return Err(SatchelError::InternalError.into()),
    };
    let hashed = match bcrypt::hash(&request.password, bcrypt::DEFAULT_COST) {
        Ok(hashed) => hashed,
        Err(e) => {
            error!("password hashing failed: {}", e);
            return Err(SatchelError::InternalError.into());
        }
    };
    db.reset_password(&id, &hashed).await?;
    info!("password reset completed for {}", user.email);
    Ok(Json(MessageResponse::new("Password has been reset")))
}

/**
 * Return the public profile for the authenticated account
 */
#[get("/profile")]
pub async fn profile(
    user: AuthenticatedUser,
    db: &State<SatchelDB>,
) -> Result<Json<UserResponse>, ApiResponse> {
    match db.get_user_by_id(&user.id).await? {
        Some(user) => Ok(Json(UserResponse::from(&user))),
        None => Err(SatchelError::UserNotFound(user.email).into()),
    }
}
