use crate::catchers::ApiResponse;
use crate::mongo::MaterialKind;
use bson::oid::ObjectId;
use lazy_static::lazy_static;
use rocket::request::FromParam;
use rocket::route::Route;
use satchel_common::errors::SatchelError;
use std::str::FromStr;

mod auth;
mod chatbot;
mod subjects;
mod subjects_v2;

lazy_static! {
    pub(crate) static ref AUTH_ROUTES: Vec<Route> = routes![
        auth::register,
        auth::login,
        auth::google_auth,
        auth::forgot_password,
        auth::reset_password,
        auth::profile,
    ];
    pub(crate) static ref SUBJECT_ROUTES: Vec<Route> = routes![
        subjects::get_subjects,
        subjects::create_subject,
        subjects::get_subject,
        subjects::update_subject,
        subjects::delete_subject,
        subjects::update_syllabus,
        subjects::get_units,
        subjects::add_unit,
        subjects::update_unit,
        subjects::delete_unit,
        subjects::add_chapter,
        subjects::update_chapter,
        subjects::delete_chapter,
        subjects::add_subtopic,
        subjects::update_subtopic,
        subjects::delete_subtopic,
        subjects::add_lecture,
        subjects::update_lecture,
        subjects::delete_lecture,
        subjects::add_reading,
        subjects::update_reading,
        subjects::delete_reading,
        subjects::add_assignment,
        subjects::update_assignment,
        subjects::delete_assignment,
        subjects::add_note,
        subjects::update_note,
        subjects::delete_note,
        subjects::add_attachment,
        subjects::delete_attachment,
    ];
    pub(crate) static ref SUBJECT_V2_ROUTES: Vec<Route> = routes![
        subjects_v2::get_subjects,
        subjects_v2::create_subject,
        subjects_v2::get_subject,
        subjects_v2::delete_subject,
        subjects_v2::add_lecture,
        subjects_v2::update_lecture,
        subjects_v2::delete_lecture,
        subjects_v2::favorite_lecture,
        subjects_v2::add_reading,
        subjects_v2::update_reading,
        subjects_v2::delete_reading,
        subjects_v2::favorite_reading,
        subjects_v2::add_assignment,
        subjects_v2::update_assignment,
        subjects_v2::delete_assignment,
        subjects_v2::favorite_assignment,
        subjects_v2::add_note,
        subjects_v2::update_note,
        subjects_v2::delete_note,
    ];
    pub(crate) static ref CHATBOT_ROUTES: Vec<Route> = routes![chatbot::ask];
}

// path segment "lectures" | "readings" | "assignments" in the shared
// attachment routes
impl<'r> FromParam<'r> for MaterialKind {
    type Error = &'r str;

    fn from_param(param: &'r str) -> Result<Self, Self::Error> {
        match param {
            "lectures" => Ok(MaterialKind::Lecture),
            "readings" => Ok(MaterialKind::Reading),
            "assignments" => Ok(MaterialKind::Assignment),
            _ => Err(param),
        }
    }
}

// subject ids come in as path strings; anything that is not a well formed
// ObjectId cannot name a stored subject, so it reports as not found
pub(crate) fn parse_subject_id(id: &str) -> Result<ObjectId, ApiResponse> {
    ObjectId::from_str(id)
        .map_err(|_| ApiResponse::from(SatchelError::SubjectNotFound(String::from(id))))
}
