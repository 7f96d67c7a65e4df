use crate::catchers::ApiResponse;
use crate::chatbot::ChatbotClient;
use crate::guards::AuthenticatedUser;
use rocket::serde::json::Json;
use rocket::State;
use satchel_common::errors::SatchelError;
use satchel_common::http::requests::AskChatbotRequest;
use satchel_common::http::responses::ChatbotResponse;
use std::time::Instant;
use tracing::warn;

/**
 * Answer a student question, optionally grounded in an attached file
 *
 * The question is validated before anything is sent upstream. Provider
 * failures do not surface as errors: the client gets a 200 with an
 * apologetic answer, and the failure is logged server side.
 *
 * @param request - { question, fileUrl? }
 * @return status:
 *             * 200 with { answer, modelUsed, processingTime }
 *             * 400 if the question is missing or blank
 */
#[post("/ask", format = "json", data = "<request>")]
pub async fn ask(
    _user: AuthenticatedUser,
    request: Json<AskChatbotRequest>,
    client: &State<ChatbotClient>,
) -> Result<Json<ChatbotResponse>, ApiResponse> {
    let question = match request.question.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return Err(SatchelError::MissingField(String::from("question")).into()),
    };

    let started = Instant::now();
    let outcome = match request.file_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => client.ask_about_file(&question, url).await,
        _ => client.ask(&question).await,
    };
    let answer = match outcome {
        Ok(answer) => answer,
        Err(e) => {
            warn!("chatbot request failed: {}", e);
            String::from(
                "I'm sorry, I couldn't process that request right now. Please try again in a moment.",
            )
        }
    };

    Ok(Json(ChatbotResponse {
        answer,
        model_used: client.model().to_string(),
        processing_time: started.elapsed().as_millis() as u64,
    }))
}
