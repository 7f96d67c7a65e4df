use crate::models::{Attachment, CourseMaterials, Note, Subtopic};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthRequest {
    pub id_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    #[serde(default)]
    pub name: String,
    pub code: Option<String>,
    pub instructor: Option<String>,
    pub semester: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub course_materials: CourseMaterials,
    #[serde(default)]
    pub notes: Vec<Note>,
}

// Update payloads carry only the fields being changed; absent fields are
// left untouched in the stored document.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubjectRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub instructor: Option<String>,
    pub semester: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub course_materials: Option<CourseMaterials>,
    pub notes: Option<Vec<Note>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateSyllabusRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateUnitRequest {
    pub title: Option<String>,
    pub weeks: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateChapterRequest {
    pub title: Option<String>,
    pub subtopics: Option<Vec<Subtopic>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateSubtopicRequest {
    pub title: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLectureRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub is_favorite: Option<bool>,
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadingRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: Option<String>,
    pub is_favorite: Option<bool>,
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub due_date: Option<String>,
    pub points: Option<f64>,
    pub instructions: Option<String>,
    pub is_completed: Option<bool>,
    pub is_favorite: Option<bool>,
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AskChatbotRequest {
    pub question: Option<String>,
    pub file_url: Option<String>,
}
