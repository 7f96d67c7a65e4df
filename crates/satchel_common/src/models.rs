use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

fn fill_id(id: &mut String) {
    if id.is_empty() {
        *id = fresh_id();
    }
}

// Account document. Optional fields cover both credential and federated
// accounts: a Google-only account has no password, a local one no googleId.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>, // bcrypt hash, never plaintext
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    // reset token fields are set and cleared together
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>, // sha256 of the emailed token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

// Fields default to allow projections
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ObjectId>, // owning account
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub course_materials: CourseMaterials,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>, // rfc3339, assigned server side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CourseMaterials {
    #[serde(default)]
    pub syllabus: Syllabus,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Syllabus {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub units: Vec<Unit>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Unit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub weeks: String, // display string like "1-3"
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Chapter {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

// Older documents stored subtopics as bare strings; newer ones as
// { id, title }. Both shapes must keep deserializing.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Subtopic {
    Titled {
        #[serde(default)]
        id: String,
        #[serde(default)]
        title: String,
    },
    Legacy(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub pages: String, // display string like "12-40"
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Note {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Attachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String, // mime type reported by the uploader
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub url: String,
}

/**
 * Identifier normalization. Every nested entity carries a uuid `id`; clients
 * may submit entities without one (or with an empty one), so each write path
 * runs ensure_ids() over the payload before it reaches the database.
 * Existing non-empty ids are always preserved.
 */
impl Subject {
    pub fn ensure_ids(&mut self) {
        self.course_materials.ensure_ids();
        for note in &mut self.notes {
            note.ensure_id();
        }
    }
}

impl CourseMaterials {
    pub fn ensure_ids(&mut self) {
        self.syllabus.ensure_ids();
        for lecture in &mut self.lectures {
            lecture.ensure_ids();
        }
        for reading in &mut self.readings {
            reading.ensure_ids();
        }
        for assignment in &mut self.assignments {
            assignment.ensure_ids();
        }
    }
}

impl Syllabus {
    pub fn ensure_ids(&mut self) {
        for unit in &mut self.units {
            unit.ensure_ids();
        }
    }
}

impl Unit {
    pub fn ensure_ids(&mut self) {
        fill_id(&mut self.id);
        for chapter in &mut self.chapters {
            chapter.ensure_ids();
        }
    }
}

impl Chapter {
    pub fn ensure_ids(&mut self) {
        fill_id(&mut self.id);
        for subtopic in &mut self.subtopics {
            subtopic.ensure_id();
        }
    }
}

impl Subtopic {
    /// Upgrades legacy bare-string subtopics to the titled shape.
    pub fn ensure_id(&mut self) {
        match self {
            Subtopic::Titled { id, .. } => fill_id(id),
            Subtopic::Legacy(title) => {
                *self = Subtopic::Titled {
                    id: fresh_id(),
                    title: std::mem::take(title),
                };
            }
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Subtopic::Titled { id, .. } => Some(id),
            Subtopic::Legacy(_) => None,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Subtopic::Titled { title, .. } => title,
            Subtopic::Legacy(title) => title,
        }
    }
}

impl Lecture {
    pub fn ensure_ids(&mut self) {
        fill_id(&mut self.id);
        for attachment in &mut self.attachments {
            attachment.ensure_id();
        }
    }
}

impl Reading {
    pub fn ensure_ids(&mut self) {
        fill_id(&mut self.id);
        for attachment in &mut self.attachments {
            attachment.ensure_id();
        }
    }
}

impl Assignment {
    pub fn ensure_ids(&mut self) {
        fill_id(&mut self.id);
        for attachment in &mut self.attachments {
            attachment.ensure_id();
        }
    }
}

impl Note {
    pub fn ensure_id(&mut self) {
        fill_id(&mut self.id);
    }
}

impl Attachment {
    pub fn ensure_id(&mut self) {
        fill_id(&mut self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_materials() -> CourseMaterials {
        CourseMaterials {
            syllabus: Syllabus {
                title: String::from("Course outline"),
                content: String::from("Weekly breakdown"),
                units: vec![Unit {
                    id: String::new(),
                    title: String::from("Foundations"),
                    weeks: String::from("1-3"),
                    chapters: vec![Chapter {
                        id: String::new(),
                        title: String::from("Intro"),
                        subtopics: vec![
                            Subtopic::Titled {
                                id: String::new(),
                                title: String::from("History"),
                            },
                            Subtopic::Legacy(String::from("Notation")),
                        ],
                    }],
                }],
            },
            lectures: vec![Lecture {
                title: String::from("Week 1"),
                attachments: vec![Attachment {
                    name: String::from("slides.pdf"),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            readings: vec![Reading::default()],
            assignments: vec![Assignment::default()],
        }
    }

    #[test]
    fn test_ensure_ids_fills_every_level() {
        let mut materials = sample_materials();
        materials.ensure_ids();
        let unit = &materials.syllabus.units[0];
        assert!(!unit.id.is_empty());
        let chapter = &unit.chapters[0];
        assert!(!chapter.id.is_empty());
        for subtopic in &chapter.subtopics {
            assert!(subtopic.id().is_some());
            assert!(!subtopic.id().unwrap().is_empty());
        }
        assert!(!materials.lectures[0].id.is_empty());
        assert!(!materials.lectures[0].attachments[0].id.is_empty());
        assert!(!materials.readings[0].id.is_empty());
        assert!(!materials.assignments[0].id.is_empty());
    }

    #[test]
    fn test_ensure_ids_preserves_existing_ids() {
        let mut unit = Unit {
            id: String::from("keep-me"),
            chapters: vec![Chapter {
                id: String::from("me-too"),
                ..Default::default()
            }],
            ..Default::default()
        };
        unit.ensure_ids();
        assert_eq!(unit.id, "keep-me");
        assert_eq!(unit.chapters[0].id, "me-too");
    }

    #[test]
    fn test_ensure_ids_are_distinct() {
        let mut materials = sample_materials();
        materials.ensure_ids();
        let mut ids = vec![
            materials.syllabus.units[0].id.clone(),
            materials.syllabus.units[0].chapters[0].id.clone(),
            materials.lectures[0].id.clone(),
            materials.readings[0].id.clone(),
            materials.assignments[0].id.clone(),
        ];
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_legacy_subtopic_upgrades_to_titled() {
        let mut subtopic = Subtopic::Legacy(String::from("Chain rule"));
        subtopic.ensure_id();
        match &subtopic {
            Subtopic::Titled { id, title } => {
                assert!(!id.is_empty());
                assert_eq!(title, "Chain rule");
            }
            Subtopic::Legacy(_) => panic!("subtopic was not upgraded"),
        }
    }

    #[test]
    fn test_subtopic_deserializes_both_shapes() {
        let titled: Subtopic = serde_json::from_str(r#"{"id":"abc","title":"Limits"}"#).unwrap();
        assert_eq!(titled.id(), Some("abc"));
        assert_eq!(titled.title(), "Limits");
        let legacy: Subtopic = serde_json::from_str(r#""Limits""#).unwrap();
        assert_eq!(legacy.id(), None);
        assert_eq!(legacy.title(), "Limits");
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let lecture = Lecture {
            id: String::from("l1"),
            is_favorite: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&lecture).unwrap();
        assert_eq!(json["isFavorite"], true);
        assert!(json.get("is_favorite").is_none());

        let assignment = Assignment {
            due_date: String::from("2024-05-01"),
            is_completed: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&assignment).unwrap();
        assert_eq!(json["dueDate"], "2024-05-01");
        assert_eq!(json["isCompleted"], true);
    }

    #[test]
    fn test_attachment_kind_serializes_as_type() {
        let attachment = Attachment {
            id: String::from("a1"),
            name: String::from("notes.pdf"),
            kind: String::from("application/pdf"),
            size: 1024,
            url: String::from("https://files.example.com/notes.pdf"),
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["type"], "application/pdf");
        assert!(json.get("kind").is_none());
        let back: Attachment = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, "application/pdf");
    }

    #[test]
    fn test_subject_deserializes_from_sparse_document() {
        // projections drop most fields; the model must still parse
        let subject: Subject = serde_json::from_str(r#"{"name":"Calculus"}"#).unwrap();
        assert_eq!(subject.name, "Calculus");
        assert!(subject.course_materials.lectures.is_empty());
        assert!(subject.notes.is_empty());
        assert!(subject.created_at.is_none());
    }
}
