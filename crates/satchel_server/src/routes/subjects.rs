use crate::catchers::ApiResponse;
use crate::guards::AuthenticatedUser;
use crate::mongo::{MaterialKind, SatchelDB};
use crate::routes::parse_subject_id;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use satchel_common::errors::SatchelError;
use satchel_common::http::requests::{
    CreateSubjectRequest, UpdateAssignmentRequest, UpdateChapterRequest, UpdateLectureRequest,
    UpdateNoteRequest, UpdateReadingRequest, UpdateSubjectRequest, UpdateSubtopicRequest,
    UpdateSyllabusRequest, UpdateUnitRequest,
};
use satchel_common::http::responses::MessageResponse;
use satchel_common::models::{
    Assignment, Attachment, Chapter, Lecture, Note, Reading, Subject, Subtopic, Syllabus, Unit,
};

/// SUBJECTS ///

/**
 * List every subject owned by the authenticated account, newest first
 */
#[get("/")]
pub async fn get_subjects(
    user: AuthenticatedUser,
    db: &State<SatchelDB>,
) -> Result<Json<Vec<Subject>>, ApiResponse> {
    Ok(Json(db.get_subjects(&user.id).await?))
}

/**
 * Create a subject. Nested materials and notes may be supplied inline; any
 * entity arriving without an id gets one assigned before insertion.
 *
 * @return status:
 *             * 201 with the stored subject (including assigned ids)
 *             * 400 if the name is blank
 */
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

/**
 * Partial update of the subject's own fields; returns the updated document
 */
#[put("/<id>", format = "json", data = "<request>")]
pub async fn update_subject(
    user: AuthenticatedUser,
    id: &str,
    request: Json<UpdateSubjectRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Subject>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let subject = db
        .update_subject(&user.id, &subject_id, request.into_inner())
        .await?;
    Ok(Json(subject))
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

/// SYLLABUS & UNITS ///

#[put("/<id>/syllabus", format = "json", data = "<request>")]
pub async fn update_syllabus(
    user: AuthenticatedUser,
    id: &str,
    request: Json<UpdateSyllabusRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Syllabus>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let syllabus = db.update_syllabus(&user.id, &subject_id, &request).await?;
    Ok(Json(syllabus))
}

#[get("/<id>/units")]
pub async fn get_units(
    user: AuthenticatedUser,
    id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<Vec<Unit>>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    Ok(Json(db.get_units(&user.id, &subject_id).await?))
}

#[post("/<id>/units", format = "json", data = "<request>")]
pub async fn add_unit(
    user: AuthenticatedUser,
    id: &str,
    request: Json<Unit>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Unit>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let unit = db
        .add_unit(&user.id, &subject_id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(unit)))
}

#[put("/<id>/units/<unit_id>", format = "json", data = "<request>")]
pub async fn update_unit(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    request: Json<UpdateUnitRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Unit>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let unit = db
        .update_unit(&user.id, &subject_id, unit_id, &request)
        .await?;
    Ok(Json(unit))
}

#[delete("/<id>/units/<unit_id>")]
pub async fn delete_unit(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_unit(&user.id, &subject_id, unit_id).await?;
    Ok(Json(MessageResponse::new("Unit deleted")))
}

#[post("/<id>/units/<unit_id>/chapters", format = "json", data = "<request>")]
pub async fn add_chapter(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    request: Json<Chapter>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Chapter>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let chapter = db
        .add_chapter(&user.id, &subject_id, unit_id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(chapter)))
}

#[put(
    "/<id>/units/<unit_id>/chapters/<chapter_id>",
    format = "json",
    data = "<request>"
)]
pub async fn update_chapter(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    chapter_id: &str,
    request: Json<UpdateChapterRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Chapter>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let chapter = db
        .update_chapter(&user.id, &subject_id, unit_id, chapter_id, &request)
        .await?;
    Ok(Json(chapter))
}

#[delete("/<id>/units/<unit_id>/chapters/<chapter_id>")]
pub async fn delete_chapter(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    chapter_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_chapter(&user.id, &subject_id, unit_id, chapter_id)
        .await?;
    Ok(Json(MessageResponse::new("Chapter deleted")))
}

/**
 * Append a subtopic to a chapter. Accepts both the titled object shape and
 * the legacy bare string; either way it is stored titled, with an id.
 */
#[post(
    "/<id>/units/<unit_id>/chapters/<chapter_id>/subtopics",
    format = "json",
    data = "<request>"
)]
pub async fn add_subtopic(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    chapter_id: &str,
    request: Json<Subtopic>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Subtopic>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let subtopic = db
        .add_subtopic(
            &user.id,
            &subject_id,
            unit_id,
            chapter_id,
            request.into_inner(),
        )
        .await?;
    Ok((Status::Created, Json(subtopic)))
}

#[put(
    "/<id>/units/<unit_id>/chapters/<chapter_id>/subtopics/<subtopic_id>",
    format = "json",
    data = "<request>"
)]
pub async fn update_subtopic(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    chapter_id: &str,
    subtopic_id: &str,
    request: Json<UpdateSubtopicRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Subtopic>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let subtopic = db
        .update_subtopic(
            &user.id,
            &subject_id,
            unit_id,
            chapter_id,
            subtopic_id,
            &request,
        )
        .await?;
    Ok(Json(subtopic))
}

#[delete("/<id>/units/<unit_id>/chapters/<chapter_id>/subtopics/<subtopic_id>")]
pub async fn delete_subtopic(
    user: AuthenticatedUser,
    id: &str,
    unit_id: &str,
    chapter_id: &str,
    subtopic_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_subtopic(&user.id, &subject_id, unit_id, chapter_id, subtopic_id)
        .await?;
    Ok(Json(MessageResponse::new("Subtopic deleted")))
}

/// COURSE MATERIALS ///

#[post("/<id>/lectures", format = "json", data = "<request>")]
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

/**
 * Partial update of one lecture, addressed by its id. The id itself is
 * never rewritten, whatever the payload carries.
 */
#[put("/<id>/lectures/<lecture_id>", format = "json", data = "<request>")]
pub async fn update_lecture(
    user: AuthenticatedUser,
    id: &str,
    lecture_id: &str,
    request: Json<UpdateLectureRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Lecture>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let lecture = db
        .update_lecture(&user.id, &subject_id, lecture_id, &request)
        .await?;
    Ok(Json(lecture))
}

#[delete("/<id>/lectures/<lecture_id>")]
pub async fn delete_lecture(
    user: AuthenticatedUser,
    id: &str,
    lecture_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_material(&user.id, &subject_id, MaterialKind::Lecture, lecture_id)
        .await?;
    Ok(Json(MessageResponse::new("Lecture deleted")))
}

#[post("/<id>/readings", format = "json", data = "<request>")]
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

#[put("/<id>/readings/<reading_id>", format = "json", data = "<request>")]
pub async fn update_reading(
    user: AuthenticatedUser,
    id: &str,
    reading_id: &str,
    request: Json<UpdateReadingRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Reading>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let reading = db
        .update_reading(&user.id, &subject_id, reading_id, &request)
        .await?;
    Ok(Json(reading))
}

#[delete("/<id>/readings/<reading_id>")]
pub async fn delete_reading(
    user: AuthenticatedUser,
    id: &str,
    reading_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_material(&user.id, &subject_id, MaterialKind::Reading, reading_id)
        .await?;
    Ok(Json(MessageResponse::new("Reading deleted")))
}

#[post("/<id>/assignments", format = "json", data = "<request>")]
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

#[put("/<id>/assignments/<assignment_id>", format = "json", data = "<request>")]
pub async fn update_assignment(
    user: AuthenticatedUser,
    id: &str,
    assignment_id: &str,
    request: Json<UpdateAssignmentRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Assignment>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let assignment = db
        .update_assignment(&user.id, &subject_id, assignment_id, &request)
        .await?;
    Ok(Json(assignment))
}

#[delete("/<id>/assignments/<assignment_id>")]
pub async fn delete_assignment(
    user: AuthenticatedUser,
    id: &str,
    assignment_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_material(
        &user.id,
        &subject_id,
        MaterialKind::Assignment,
        assignment_id,
    )
    .await?;
    Ok(Json(MessageResponse::new("Assignment deleted")))
}

/// NOTES ///

#[post("/<id>/notes", format = "json", data = "<request>")]
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

#[put("/<id>/notes/<note_id>", format = "json", data = "<request>")]
pub async fn update_note(
    user: AuthenticatedUser,
    id: &str,
    note_id: &str,
    request: Json<UpdateNoteRequest>,
    db: &State<SatchelDB>,
) -> Result<Json<Note>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let note = db
        .update_note(&user.id, &subject_id, note_id, &request)
        .await?;
    Ok(Json(note))
}

#[delete("/<id>/notes/<note_id>")]
pub async fn delete_note(
    user: AuthenticatedUser,
    id: &str,
    note_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_note(&user.id, &subject_id, note_id).await?;
    Ok(Json(MessageResponse::new("Note deleted")))
}

/// ATTACHMENTS ///

/**
 * Attach file metadata to a lecture, reading, or assignment
 *
 * @param section - which material array: lectures | readings | assignments
 * @return status:
 *             * 201 with the stored attachment (id assigned if absent)
 *             * 404 if the subject or the target entry is missing
 */
#[post(
    "/<id>/<section>/<entry_id>/attachments",
    format = "json",
    data = "<request>"
)]
pub async fn add_attachment(
    user: AuthenticatedUser,
    id: &str,
    section: MaterialKind,
    entry_id: &str,
    request: Json<Attachment>,
    db: &State<SatchelDB>,
) -> Result<(Status, Json<Attachment>), ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    let attachment = db
        .add_attachment(
            &user.id,
            &subject_id,
            section,
            entry_id,
            request.into_inner(),
        )
        .await?;
    Ok((Status::Created, Json(attachment)))
}

#[delete("/<id>/<section>/<entry_id>/attachments/<attachment_id>")]
pub async fn delete_attachment(
    user: AuthenticatedUser,
    id: &str,
    section: MaterialKind,
    entry_id: &str,
    attachment_id: &str,
    db: &State<SatchelDB>,
) -> Result<Json<MessageResponse>, ApiResponse> {
    let subject_id = parse_subject_id(id)?;
    db.delete_attachment(&user.id, &subject_id, section, entry_id, attachment_id)
        .await?;
    Ok(Json(MessageResponse::new("Attachment deleted")))
}
