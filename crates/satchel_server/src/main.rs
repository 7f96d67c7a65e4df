#[macro_use]
extern crate rocket;

use crate::catchers::{bad_request, internal_error, not_found, unauthorized, unprocessable};
use crate::chatbot::ChatbotClient;
use crate::cors::Cors;
use crate::google::GoogleVerifier;
use crate::mailer::Mailer;
use crate::mongo::SatchelDB;
use crate::routes::{AUTH_ROUTES, CHATBOT_ROUTES, SUBJECT_ROUTES, SUBJECT_V2_ROUTES};
use lazy_static::lazy_static;
use rocket::{Build, Rocket};
use std::env;

mod catchers;
mod chatbot;
mod cors;
mod google;
mod guards;
mod mailer;
mod mongo;
mod routes;
#[cfg(test)]
mod tests;
mod utils;

lazy_static! {
    pub static ref MONGODB_URI: String =
        env::var("MONGODB_URI").unwrap_or_else(|_| String::from("mongodb://localhost:27017"));
    pub static ref DATABASE_NAME: String =
        env::var("DATABASE_NAME").unwrap_or_else(|_| String::from("satchel"));
    pub static ref JWT_SECRET: String =
        env::var("JWT_SECRET").unwrap_or_else(|_| String::from("satchel-dev-secret"));
    pub static ref JWT_EXPIRES_IN: String =
        env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| String::from("7d"));
    pub static ref CLIENT_URL: String =
        env::var("CLIENT_URL").unwrap_or_else(|_| String::from("http://localhost:3000"));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    // Initialize logger
    tracing_subscriber::fmt::init();
    // connect to mongodb and build the shared clients
    let mongo = SatchelDB::init(&DATABASE_NAME).await?;
    let mailer = Mailer::from_env()?;
    let google = GoogleVerifier::from_env();
    let chatbot = ChatbotClient::from_env();
    build_rocket(mongo, mailer, google, chatbot)
        .launch()
        .await?;
    Ok(())
}

/**
 * Assemble the rocket with managed state, mounts, and catchers. Tests build
 * the same rocket against a scratch database, so every mount stays in sync
 * between the binary and the suite.
 */
pub(crate) fn build_rocket(
    mongo: SatchelDB,
    mailer: Mailer,
    google: GoogleVerifier,
    chatbot: ChatbotClient,
) -> Rocket<Build> {
    let mut figment = rocket::Config::figment();
    if let Ok(Ok(port)) = env::var("PORT").map(|p| p.parse::<u16>()) {
        figment = figment.merge(("port", port));
    }
    rocket::custom(figment)
        .manage(mongo)
        .manage(mailer)
        .manage(google)
        .manage(chatbot)
        .attach(Cors)
        .mount("/", routes![health, crate::cors::preflight])
        .mount("/api/auth", AUTH_ROUTES.clone())
        .mount("/api/subjects", SUBJECT_ROUTES.clone())
        .mount("/api/subjectsV2", SUBJECT_V2_ROUTES.clone())
        .mount("/api/chatbot", CHATBOT_ROUTES.clone())
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                not_found,
                unprocessable,
                internal_error
            ],
        )
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}
