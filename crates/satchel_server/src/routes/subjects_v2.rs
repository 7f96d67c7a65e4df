//! Alias surface for the older client generation. Routes here use singular
//! section names (`/lecture/<id>` rather than `/lectures/<id>`) and add the
//! favorite toggles, but read and write the same subjects collection as the
//! primary surface, so documents created on either side show up on both.

use crate::catchers::ApiResponse;
use crate::guards::AuthenticatedUser;
use crate::mongo::{MaterialKind, SatchelDB};
use crate::routes::parse_subject_id;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use satchel_common::errors::SatchelError;
use satchel_common::http::requests::{
    CreateSubjectRequest, UpdateAssignmentRequest, UpdateLectureRequest, UpdateNoteRequest,
    UpdateReadingRequest,
};
use satchel_common::http::responses::{FavoriteResponse, MessageResponse};
use satchel_common::models::{Assignment, Lecture, Note, Reading, Subject};

#[get("/")]
pub async fn get_subjects(
    user: AuthenticatedUser,
    db: &State<SatchelDB>,
) -> Result<Json<Vec<Subject>>, ApiResponse> {
    Ok(Json(db.get_subjects(&user.id).await?))
}

#[post("/", format = "json", data = "<request>")]
pub async fn create_subject(
    user: AuthenticatedUser,
    request: Json<CreateSubjectRequest>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Subject>), ApiResponse> {
    let request = request.into_inner();
    if request.name.trim().is_empty() {
        return Err(SatchelError::MissingField(String::from("name")).into());
    }
    let subject = db.create_subject(&user.id, request).await?;
    Ok((Status::Created, Json(subject)))
}

#[get("/<id>")]
pub async fn get_subject(
    user: AuthenticatedUser,
    id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<Subject>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    Ok(Json(db.get_subject(&user.id, &subject_id).await?))
}

#[delete("/<id>")]
pub async fn delete_subject(
    user: AuthenticatedUser,
    id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_subject(&user.id, &subject_id).await?;
    Ok(Json(MessageResponse::new("Subject deleted")))
}

/// LECTURES ///

#[post("/<id>/lecture", format = "json", data = "<request>")]
pub async fn add_lecture(
    user: AuthenticatedUser,
    id: &str,
    request: Json<Lecture>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Lecture>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let lecture = db
        .add_lecture(&user.id, &subject_id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(lecture)))
}

#[put("/<id>/lecture/<entry_id>", format = "json", data = "<request>")]
pub async fn update_lecture(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    request: Json<UpdateLectureRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Lecture>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let lecture = db
        .update_lecture(&user.id, &subject_id, entry_id, &request)
        .await?;
    Ok(Json(lecture))
}

#[delete("/<id>/lecture/<entry_id>")]
pub async fn delete_lecture(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_material(&user.id, &subject_id, MaterialKind::Lecture, entry_id)
        .await?;
    Ok(Json(MessageResponse::new("Lecture deleted")))
}

/**
 * Flip the lecture's favorite flag with a conditional write, so two
 * overlapping toggles land as strict alternation rather than a lost update
 *
 * @return status:
 *             * 200 with { id, isFavorite } reflecting the new value
 *             * 404 if the subject or lecture is missing
 */
#[put("/<id>/lecture/<entry_id>/favorite")]
pub async fn favorite_lecture(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<FavoriteResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let is_favorite = db
        .toggle_favorite(&user.id, &subject_id, MaterialKind::Lecture, entry_id)
        .await?;
    Ok(Json(FavoriteResponse {
        id: entry_id.to_string(),
        is_favorite,
    }))
}

/// READINGS ///

#[post("/<id>/reading", format = "json", data = "<request>")]
pub async fn add_reading(
    user: AuthenticatedUser,
    id: &str,
    request: Json<Reading>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Reading>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let reading = db
        .add_reading(&user.id, &subject_id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(reading)))
}

#[put("/<id>/reading/<entry_id>", format = "json", data = "<request>")]
pub async fn update_reading(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    request: Json<UpdateReadingRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Reading>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let reading = db
        .update_reading(&user.id, &subject_id, entry_id, &request)
        .await?;
    Ok(Json(reading))
}

#[delete("/<id>/reading/<entry_id>")]
pub async fn delete_reading(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_material(&user.id, &subject_id, MaterialKind::Reading, entry_id)
        .await?;
    Ok(Json(MessageResponse::new("Reading deleted")))
}

#[put("/<id>/reading/<entry_id>/favorite")]
pub async fn favorite_reading(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<FavoriteResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let is_favorite = db
        .toggle_favorite(&user.id, &subject_id, MaterialKind::Reading, entry_id)
        .await?;
    Ok(Json(FavoriteResponse {
        id: entry_id.to_string(),
        is_favorite,
    }))
}

/// ASSIGNMENTS ///

#[post("/<id>/assignment", format = "json", data = "<request>")]
pub async fn add_assignment(
    user: AuthenticatedUser,
    id: &str,
    request: Json<Assignment>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Assignment>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let assignment = db
        .add_assignment(&user.id, &subject_id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(assignment)))
}

#[put("/<id>/assignment/<entry_id>", format = "json", data = "<request>")]
pub async fn update_assignment(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    request: Json<UpdateAssignmentRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Assignment>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let assignment = db
        .update_assignment(&user.id, &subject_id, entry_id, &request)
        .await?;
    Ok(Json(assignment))
}

#[delete("/<id>/assignment/<entry_id>")]
pub async fn delete_assignment(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_material(&user.id, &subject_id, MaterialKind::Assignment, entry_id)
        .await?;
    Ok(Json(MessageResponse::new("Assignment deleted")))
}

#[put("/<id>/assignment/<entry_id>/favorite")]
pub async fn favorite_assignment(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<FavoriteResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let is_favorite = db
        .toggle_favorite(&user.id, &subject_id, MaterialKind::Assignment, entry_id)
        .await?;
    Ok(Json(FavoriteResponse {
        id: entry_id.to_string(),
        is_favorite,
    }))
}

/// NOTES ///

#[post("/<id>/note", format = "json", data = "<request>")]
pub async fn add_note(
    user: AuthenticatedUser,
    id: &str,
    request: Json<Note>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Note>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let note = db
        .add_note(&user.id, &subject_id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(note)))
}

#[put("/<id>/note/<entry_id>", format = "json", data = "<request>")]
pub async fn update_note(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    request: Json<UpdateNoteRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Note>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let note = db
        .update_note(&user.id, &subject_id, entry_id, &request)
        .await?;
    Ok(Json(note))
}

#[delete("/<id>/note/<entry_id>")]
pub async fn delete_note(
    user: AuthenticatedUser,
    id: &str,
    entry_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_note(&user.id, &subject_id, entry_id).await?;
    Ok(Json(MessageResponse::new("Note deleted")))
}
