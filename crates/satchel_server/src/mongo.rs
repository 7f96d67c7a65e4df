use crate::utils::now_rfc3339;
use crate::MONGODB_URI;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions,
    ReturnDocument, ServerApi, ServerApiVersion, UpdateOptions,
};
use mongodb::{Client, Collection, IndexModel};
use satchel_common::errors::SatchelError;
use satchel_common::http::requests::{
    CreateSubjectRequest, UpdateAssignmentRequest, UpdateChapterRequest, UpdateLectureRequest,
    UpdateNoteRequest, UpdateReadingRequest, UpdateSubjectRequest, UpdateSubtopicRequest,
    UpdateSyllabusRequest, UpdateUnitRequest,
};
use satchel_common::models::{
    Assignment, Attachment, Chapter, Lecture, Note, Reading, Subject, Subtopic, Syllabus, Unit,
    User,
};
use serde::Serialize;

/// Which of the three course material arrays an operation targets. The
/// arrays share their write paths, so most material methods take a kind
/// instead of existing in triplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Lecture,
    Reading,
    Assignment,
}

impl MaterialKind {
    pub fn array_path(&self) -> &'static str {
        match self {
            MaterialKind::Lecture => "courseMaterials.lectures",
            MaterialKind::Reading => "courseMaterials.readings",
            MaterialKind::Assignment => "courseMaterials.assignments",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaterialKind::Lecture => "lecture",
            MaterialKind::Reading => "reading",
            MaterialKind::Assignment => "assignment",
        }
    }
}

pub struct SatchelDB {
    users: Collection<User>,
    subjects: Collection<Subject>,
}

impl SatchelDB {
    pub async fn init(database_name: &str) -> Result<Self, SatchelError> {
        let client = connect().await?;
        let db = client.database(database_name);
        let users = db.collection("users");
        let subjects = db.collection("subjects");
        let db = Self { users, subjects };
        db.ensure_indexes().await?;
        Ok(db)
    }

    // one email, one account, even under concurrent registration
    async fn ensure_indexes(&self) -> Result<(), SatchelError> {
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(model, None).await.map_err(mongo_err)?;
        Ok(())
    }

    /**
     * Drops the entire database to start off with clean state for testing
     */
    pub async fn drop_database(database_name: &str) -> Result<(), SatchelError> {
        let client = connect().await?;
        client
            .database(database_name)
            .drop(None)
            .await
            .map_err(mongo_err)
    }

    /// USER FUNCTIONS ///

    /**
     * Insert a new account after confirming the email is unused
     *
     * @param user - the account document to insert (id must be None)
     * @return the ObjectId assigned by mongo, or EmailInUse
     */
    pub async fn create_user(&self, user: &User) -> Result<ObjectId, SatchelError> {
        let query = doc! { "email": &user.email };
        let projection = doc! { "_id": 1 };
        let find_options = FindOneOptions::builder().projection(projection).build();
        let existing = self
            .users
            .find_one(query, Some(find_options))
            .await
            .map_err(mongo_err)?;
        if existing.is_some() {
            return Err(SatchelError::EmailInUse(user.email.clone()));
        }
        // the unique index catches registrations that race past the check
        let result = match self.users.insert_one(user, None).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => {
                return Err(SatchelError::EmailInUse(user.email.clone()))
            }
            Err(e) => return Err(mongo_err(e)),
        };
        result
            .inserted_id
            .as_object_id()
            .ok_or(SatchelError::InternalError)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SatchelError> {
        let filter = doc! { "email": email };
        self.users.find_one(filter, None).await.map_err(mongo_err)
    }

    pub async fn get_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, SatchelError> {
        let filter = doc! { "_id": id };
        self.users.find_one(filter, None).await.map_err(mongo_err)
    }

    /**
     * Attach a Google subject id to an existing account, adopting the Google
     * profile picture only when the account has none of its own
     */
    pub async fn link_google_account(
        &self,
        id: &ObjectId,
        google_id: &str,
        picture: Option<&str>,
    ) -> Result<(), SatchelError> {
        let mut set = doc! { "googleId": google_id };
        if let Some(picture) = picture {
            set.insert("profilePicture", picture);
        }
        self.users
            .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    // the token hash and its expiry always move together
    pub async fn set_reset_token(
        &self,
        id: &ObjectId,
        token_hash: &str,
        expires: DateTime,
    ) -> Result<(), SatchelError> {
        let update = doc! {
            "$set": { "passwordResetToken": token_hash, "passwordResetExpires": expires }
        };
        self.users
            .update_one(doc! { "_id": id }, update, None)
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    pub async fn clear_reset_token(&self, id: &ObjectId) -> Result<(), SatchelError> {
        let update = doc! {
            "$unset": { "passwordResetToken": "", "passwordResetExpires": "" }
        };
        self.users
            .update_one(doc! { "_id": id }, update, None)
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    /**
     * Look up the account holding an unexpired reset token
     *
     * @param token_hash - sha256 of the raw token from the emailed link
     * @return the account, or None if the hash is unknown or past expiry
     */
    pub async fn get_user_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, SatchelError> {
        let filter = doc! {
            "passwordResetToken": token_hash,
            "passwordResetExpires": { "$gt": DateTime::now() },
        };
        self.users.find_one(filter, None).await.map_err(mongo_err)
    }

    // store the new hash and burn the token in one statement
    pub async fn reset_password(
        &self,
        id: &ObjectId,
        password_hash: &str,
    ) -> Result<(), SatchelError> {
        let update = doc! {
            "$set": { "password": password_hash },
            "$unset": { "passwordResetToken": "", "passwordResetExpires": "" },
        };
        self.users
            .update_one(doc! { "_id": id }, update, None)
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    /// SUBJECT FUNCTIONS ///

    pub async fn create_subject(
        &self,
        user: &ObjectId,
        request: CreateSubjectRequest,
    ) -> Result<Subject, SatchelError> {
        let now = now_rfc3339();
        let mut subject = Subject {
            id: None,
            user: Some(*user),
            name: request.name,
            code: request.code,
            instructor: request.instructor,
            semester: request.semester,
            color: request.color,
            description: request.description,
            course_materials: request.course_materials,
            notes: request.notes,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        subject.ensure_ids();
        let result = self
            .subjects
            .insert_one(&subject, None)
            .await
            .map_err(mongo_err)?;
        subject.id = result.inserted_id.as_object_id();
        Ok(subject)
    }

    pub async fn get_subjects(&self, user: &ObjectId) -> Result<Vec<Subject>, SatchelError> {
        let filter = doc! { "user": user };
        let find_options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let cursor = self
            .subjects
            .find(filter, Some(find_options))
            .await
            .map_err(mongo_err)?;
        cursor.try_collect().await.map_err(mongo_err)
    }

    pub async fn get_subject(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
    ) -> Result<Subject, SatchelError> {
        let filter = doc! { "_id": subject_id, "user": user };
        self.subjects
            .find_one(filter, None)
            .await
            .map_err(mongo_err)?
            .ok_or_else(|| SatchelError::SubjectNotFound(subject_id.to_hex()))
    }

    /**
     * Partial update of a subject's own fields. Absent request fields keep
     * their stored values; whole-array replacements get ids filled first.
     *
     * @return the full updated subject
     */
    pub async fn update_subject(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        request: UpdateSubjectRequest,
    ) -> Result<Subject, SatchelError> {
        let mut set = Document::new();
        if let Some(name) = request.name {
            set.insert("name", name);
        }
        if let Some(code) = request.code {
            set.insert("code", code);
        }
        if let Some(instructor) = request.instructor {
            set.insert("instructor", instructor);
        }
        if let Some(semester) = request.semester {
            set.insert("semester", semester);
        }
        if let Some(color) = request.color {
            set.insert("color", color);
        }
        if let Some(description) = request.description {
            set.insert("description", description);
        }
        if let Some(mut course_materials) = request.course_materials {
            course_materials.ensure_ids();
            set.insert("courseMaterials", to_bson(&course_materials)?);
        }
        if let Some(mut notes) = request.notes {
            for note in &mut notes {
                note.ensure_id();
            }
            set.insert("notes", to_bson(&notes)?);
        }
        set.insert("updatedAt", now_rfc3339());
        let filter = doc! { "_id": subject_id, "user": user };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.subjects
            .find_one_and_update(filter, doc! { "$set": set }, Some(options))
            .await
            .map_err(mongo_err)?
            .ok_or_else(|| SatchelError::SubjectNotFound(subject_id.to_hex()))
    }

    pub async fn delete_subject(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
    ) -> Result<(), SatchelError> {
        let filter = doc! { "_id": subject_id, "user": user };
        let result = self
            .subjects
            .delete_one(filter, None)
            .await
            .map_err(mongo_err)?;
        if result.deleted_count == 0 {
            return Err(SatchelError::SubjectNotFound(subject_id.to_hex()));
        }
        Ok(())
    }

    /// SYLLABUS FUNCTIONS ///

    pub async fn update_syllabus(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        request: &UpdateSyllabusRequest,
    ) -> Result<Syllabus, SatchelError> {
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert("courseMaterials.syllabus.title", title);
        }
        if let Some(content) = &request.content {
            set.insert("courseMaterials.syllabus.content", content);
        }
        set.insert("updatedAt", now_rfc3339());
        let filter = doc! { "_id": subject_id, "user": user };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let subject = self
            .subjects
            .find_one_and_update(filter, doc! { "$set": set }, Some(options))
            .await
            .map_err(mongo_err)?
            .ok_or_else(|| SatchelError::SubjectNotFound(subject_id.to_hex()))?;
        Ok(subject.course_materials.syllabus)
    }

    pub async fn get_units(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
    ) -> Result<Vec<Unit>, SatchelError> {
        let filter = doc! { "_id": subject_id, "user": user };
        let projection = doc! { "courseMaterials.syllabus.units": 1 };
        let find_options = FindOneOptions::builder().projection(projection).build();
        let subject = self
            .subjects
            .find_one(filter, Some(find_options))
            .await
            .map_err(mongo_err)?
            .ok_or_else(|| SatchelError::SubjectNotFound(subject_id.to_hex()))?;
        Ok(subject.course_materials.syllabus.units)
    }

    pub async fn add_unit(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        mut unit: Unit,
    ) -> Result<Unit, SatchelError> {
        unit.ensure_ids();
        let filter = doc! { "_id": subject_id, "user": user };
        let update = doc! {
            "$push": { "courseMaterials.syllabus.units": to_bson(&unit)? },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let result = self
            .subjects
            .update_one(filter, update, None)
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(SatchelError::SubjectNotFound(subject_id.to_hex()));
        }
        Ok(unit)
    }

    pub async fn update_unit(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        request: &UpdateUnitRequest,
    ) -> Result<Unit, SatchelError> {
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert("courseMaterials.syllabus.units.$[u].title", title);
        }
        if let Some(weeks) = &request.weeks {
            set.insert("courseMaterials.syllabus.units.$[u].weeks", weeks);
        }
        // an array filter whose identifier goes unused is a server error, so
        // only attach it when the set doc actually targets the unit
        let targets_unit = !set.is_empty();
        set.insert("updatedAt", now_rfc3339());
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units.id": unit_id,
        };
        let mut options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        if targets_unit {
            options.array_filters = Some(vec![doc! { "u.id": unit_id }]);
        }
        let updated = self
            .subjects
            .find_one_and_update(filter, doc! { "$set": set }, Some(options))
            .await
            .map_err(mongo_err)?;
        match updated {
            Some(subject) => find_unit(&subject, unit_id)
                .ok_or_else(|| entity_not_found("unit", unit_id)),
            None => Err(self.missing_unit(user, subject_id, unit_id).await),
        }
    }

    pub async fn delete_unit(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
    ) -> Result<(), SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units.id": unit_id,
        };
        let update = doc! {
            "$pull": { "courseMaterials.syllabus.units": { "id": unit_id } },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let result = self
            .subjects
            .update_one(filter, update, None)
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self.missing_unit(user, subject_id, unit_id).await);
        }
        Ok(())
    }

    pub async fn add_chapter(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        mut chapter: Chapter,
    ) -> Result<Chapter, SatchelError> {
        chapter.ensure_ids();
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units.id": unit_id,
        };
        let update = doc! {
            "$push": { "courseMaterials.syllabus.units.$[u].chapters": to_bson(&chapter)? },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let options = UpdateOptions::builder()
            .array_filters(vec![doc! { "u.id": unit_id }])
            .build();
        let result = self
            .subjects
            .update_one(filter, update, Some(options))
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self.missing_unit(user, subject_id, unit_id).await);
        }
        Ok(chapter)
    }

    pub async fn update_chapter(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
        request: &UpdateChapterRequest,
    ) -> Result<Chapter, SatchelError> {
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert("courseMaterials.syllabus.units.$[u].chapters.$[c].title", title);
        }
        if let Some(subtopics) = &request.subtopics {
            let mut subtopics = subtopics.clone();
            for subtopic in &mut subtopics {
                subtopic.ensure_id();
            }
            set.insert(
                "courseMaterials.syllabus.units.$[u].chapters.$[c].subtopics",
                to_bson(&subtopics)?,
            );
        }
        let targets_chapter = !set.is_empty();
        set.insert("updatedAt", now_rfc3339());
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units": {
                "$elemMatch": { "id": unit_id, "chapters.id": chapter_id }
            },
        };
        let mut options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        if targets_chapter {
            options.array_filters =
                Some(vec![doc! { "u.id": unit_id }, doc! { "c.id": chapter_id }]);
        }
        let updated = self
            .subjects
            .find_one_and_update(filter, doc! { "$set": set }, Some(options))
            .await
            .map_err(mongo_err)?;
        match updated {
            Some(subject) => find_chapter(&subject, unit_id, chapter_id)
                .ok_or_else(|| entity_not_found("chapter", chapter_id)),
            None => Err(self.missing_chapter(user, subject_id, unit_id, chapter_id).await),
        }
    }

    pub async fn delete_chapter(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
    ) -> Result<(), SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units": {
                "$elemMatch": { "id": unit_id, "chapters.id": chapter_id }
            },
        };
        let update = doc! {
            "$pull": { "courseMaterials.syllabus.units.$[u].chapters": { "id": chapter_id } },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let options = UpdateOptions::builder()
            .array_filters(vec![doc! { "u.id": unit_id }])
            .build();
        let result = self
            .subjects
            .update_one(filter, update, Some(options))
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self.missing_chapter(user, subject_id, unit_id, chapter_id).await);
        }
        Ok(())
    }

    pub async fn add_subtopic(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
        mut subtopic: Subtopic,
    ) -> Result<Subtopic, SatchelError> {
        subtopic.ensure_id();
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units": {
                "$elemMatch": { "id": unit_id, "chapters.id": chapter_id }
            },
        };
        let update = doc! {
            "$push": {
                "courseMaterials.syllabus.units.$[u].chapters.$[c].subtopics": to_bson(&subtopic)?
            },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let options = UpdateOptions::builder()
            .array_filters(vec![doc! { "u.id": unit_id }, doc! { "c.id": chapter_id }])
            .build();
        let result = self
            .subjects
            .update_one(filter, update, Some(options))
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self.missing_chapter(user, subject_id, unit_id, chapter_id).await);
        }
        Ok(subtopic)
    }

    pub async fn update_subtopic(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
        subtopic_id: &str,
        request: &UpdateSubtopicRequest,
    ) -> Result<Subtopic, SatchelError> {
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert(
                "courseMaterials.syllabus.units.$[u].chapters.$[c].subtopics.$[s].title",
                title,
            );
        }
        let targets_subtopic = !set.is_empty();
        set.insert("updatedAt", now_rfc3339());
        // legacy string subtopics carry no id and are not addressable here;
        // they become addressable once a chapter update rewrites them
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units": {
                "$elemMatch": {
                    "id": unit_id,
                    "chapters": {
                        "$elemMatch": { "id": chapter_id, "subtopics.id": subtopic_id }
                    },
                }
            },
        };
        let mut options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        if targets_subtopic {
            options.array_filters = Some(vec![
                doc! { "u.id": unit_id },
                doc! { "c.id": chapter_id },
                doc! { "s.id": subtopic_id },
            ]);
        }
        let updated = self
            .subjects
            .find_one_and_update(filter, doc! { "$set": set }, Some(options))
            .await
            .map_err(mongo_err)?;
        match updated {
            Some(subject) => find_subtopic(&subject, unit_id, chapter_id, subtopic_id)
                .ok_or_else(|| entity_not_found("subtopic", subtopic_id)),
            None => {
                Err(self
                    .missing_subtopic(user, subject_id, unit_id, chapter_id, subtopic_id)
                    .await)
            }
        }
    }

    pub async fn delete_subtopic(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
        subtopic_id: &str,
    ) -> Result<(), SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units": {
                "$elemMatch": {
                    "id": unit_id,
                    "chapters": {
                        "$elemMatch": { "id": chapter_id, "subtopics.id": subtopic_id }
                    },
                }
            },
        };
        let update = doc! {
            "$pull": {
                "courseMaterials.syllabus.units.$[u].chapters.$[c].subtopics": { "id": subtopic_id }
            },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let options = UpdateOptions::builder()
            .array_filters(vec![doc! { "u.id": unit_id }, doc! { "c.id": chapter_id }])
            .build();
        let result = self
            .subjects
            .update_one(filter, update, Some(options))
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self
                .missing_subtopic(user, subject_id, unit_id, chapter_id, subtopic_id)
                .await);
        }
        Ok(())
    }

    /// MATERIAL FUNCTIONS (lectures / readings / assignments) ///

    pub async fn add_lecture(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        mut lecture: Lecture,
    ) -> Result<Lecture, SatchelError> {
        lecture.ensure_ids();
        self.push_material(user, subject_id, MaterialKind::Lecture, to_bson(&lecture)?)
            .await?;
        Ok(lecture)
    }

    pub async fn add_reading(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        mut reading: Reading,
    ) -> Result<Reading, SatchelError> {
        reading.ensure_ids();
        self.push_material(user, subject_id, MaterialKind::Reading, to_bson(&reading)?)
            .await?;
        Ok(reading)
    }

    pub async fn add_assignment(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        mut assignment: Assignment,
    ) -> Result<Assignment, SatchelError> {
        assignment.ensure_ids();
        self.push_material(
            user,
            subject_id,
            MaterialKind::Assignment,
            to_bson(&assignment)?,
        )
        .await?;
        Ok(assignment)
    }

    pub async fn update_lecture(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        lecture_id: &str,
        request: &UpdateLectureRequest,
    ) -> Result<Lecture, SatchelError> {
        let kind = MaterialKind::Lecture;
        let prefix = format!("{}.$[entry]", kind.array_path());
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert(format!("{}.title", prefix), title);
        }
        if let Some(date) = &request.date {
            set.insert(format!("{}.date", prefix), date);
        }
        if let Some(description) = &request.description {
            set.insert(format!("{}.description", prefix), description);
        }
        if let Some(is_favorite) = request.is_favorite {
            set.insert(format!("{}.isFavorite", prefix), is_favorite);
        }
        if let Some(attachments) = &request.attachments {
            set.insert(
                format!("{}.attachments", prefix),
                attachments_bson(attachments)?,
            );
        }
        let subject = self
            .update_material(user, subject_id, kind, lecture_id, set)
            .await?;
        subject
            .course_materials
            .lectures
            .into_iter()
            .find(|lecture| lecture.id == lecture_id)
            .ok_or_else(|| entity_not_found(kind.label(), lecture_id))
    }

    pub async fn update_reading(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        reading_id: &str,
        request: &UpdateReadingRequest,
    ) -> Result<Reading, SatchelError> {
        let kind = MaterialKind::Reading;
        let prefix = format!("{}.$[entry]", kind.array_path());
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert(format!("{}.title", prefix), title);
        }
        if let Some(author) = &request.author {
            set.insert(format!("{}.author", prefix), author);
        }
        if let Some(pages) = &request.pages {
            set.insert(format!("{}.pages", prefix), pages);
        }
        if let Some(is_favorite) = request.is_favorite {
            set.insert(format!("{}.isFavorite", prefix), is_favorite);
        }
        if let Some(attachments) = &request.attachments {
            set.insert(
                format!("{}.attachments", prefix),
                attachments_bson(attachments)?,
            );
        }
        let subject = self
            .update_material(user, subject_id, kind, reading_id, set)
            .await?;
        subject
            .course_materials
            .readings
            .into_iter()
            .find(|reading| reading.id == reading_id)
            .ok_or_else(|| entity_not_found(kind.label(), reading_id))
    }

    pub async fn update_assignment(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        assignment_id: &str,
        request: &UpdateAssignmentRequest,
    ) -> Result<Assignment, SatchelError> {
        let kind = MaterialKind::Assignment;
        let prefix = format!("{}.$[entry]", kind.array_path());
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert(format!("{}.title", prefix), title);
        }
        if let Some(due_date) = &request.due_date {
            set.insert(format!("{}.dueDate", prefix), due_date);
        }
        if let Some(points) = request.points {
            set.insert(format!("{}.points", prefix), points);
        }
        if let Some(instructions) = &request.instructions {
            set.insert(format!("{}.instructions", prefix), instructions);
        }
        if let Some(is_completed) = request.is_completed {
            set.insert(format!("{}.isCompleted", prefix), is_completed);
        }
        if let Some(is_favorite) = request.is_favorite {
            set.insert(format!("{}.isFavorite", prefix), is_favorite);
        }
        if let Some(attachments) = &request.attachments {
            set.insert(
                format!("{}.attachments", prefix),
                attachments_bson(attachments)?,
            );
        }
        let subject = self
            .update_material(user, subject_id, kind, assignment_id, set)
            .await?;
        subject
            .course_materials
            .assignments
            .into_iter()
            .find(|assignment| assignment.id == assignment_id)
            .ok_or_else(|| entity_not_found(kind.label(), assignment_id))
    }

    pub async fn delete_material(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
    ) -> Result<(), SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            format!("{}.id", kind.array_path()): entry_id,
        };
        let update = doc! {
            "$pull": { kind.array_path(): { "id": entry_id } },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let result = self
            .subjects
            .update_one(filter, update, None)
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self.missing_material(user, subject_id, kind, entry_id).await);
        }
        Ok(())
    }

    /**
     * Flip an entry's isFavorite flag. The write is conditioned on the flag
     * value that was read, so two racing toggles produce two flips rather
     * than one; the losing writer re-reads and retries.
     *
     * @return the flag value after this toggle
     */
    pub async fn toggle_favorite(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
    ) -> Result<bool, SatchelError> {
        for _ in 0..3 {
            let current = self.read_favorite(user, subject_id, kind, entry_id).await?;
            let filter = doc! { "_id": subject_id, "user": user };
            let update = doc! {
                "$set": { format!("{}.$[entry].isFavorite", kind.array_path()): !current }
            };
            let options = UpdateOptions::builder()
                .array_filters(vec![doc! { "entry.id": entry_id, "entry.isFavorite": current }])
                .build();
            let result = self
                .subjects
                .update_one(filter, update, Some(options))
                .await
                .map_err(mongo_err)?;
            if result.modified_count > 0 {
                return Ok(!current);
            }
        }
        Err(SatchelError::MongoError(String::from(
            "favorite toggle lost three consecutive races",
        )))
    }

    pub async fn add_attachment(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
        mut attachment: Attachment,
    ) -> Result<Attachment, SatchelError> {
        attachment.ensure_id();
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            format!("{}.id", kind.array_path()): entry_id,
        };
        let update = doc! {
            "$push": {
                format!("{}.$[entry].attachments", kind.array_path()): to_bson(&attachment)?
            },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let options = UpdateOptions::builder()
            .array_filters(vec![doc! { "entry.id": entry_id }])
            .build();
        let result = self
            .subjects
            .update_one(filter, update, Some(options))
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self.missing_material(user, subject_id, kind, entry_id).await);
        }
        Ok(attachment)
    }

    pub async fn delete_attachment(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
        attachment_id: &str,
    ) -> Result<(), SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            kind.array_path(): {
                "$elemMatch": { "id": entry_id, "attachments.id": attachment_id }
            },
        };
        let update = doc! {
            "$pull": {
                format!("{}.$[entry].attachments", kind.array_path()): { "id": attachment_id }
            },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let options = UpdateOptions::builder()
            .array_filters(vec![doc! { "entry.id": entry_id }])
            .build();
        let result = self
            .subjects
            .update_one(filter, update, Some(options))
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            if self.material_exists(user, subject_id, kind, entry_id).await? {
                return Err(entity_not_found("attachment", attachment_id));
            }
            return Err(self.missing_material(user, subject_id, kind, entry_id).await);
        }
        Ok(())
    }

    /// NOTE FUNCTIONS ///

    pub async fn add_note(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        mut note: Note,
    ) -> Result<Note, SatchelError> {
        note.ensure_id();
        let filter = doc! { "_id": subject_id, "user": user };
        let update = doc! {
            "$push": { "notes": to_bson(&note)? },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let result = self
            .subjects
            .update_one(filter, update, None)
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(SatchelError::SubjectNotFound(subject_id.to_hex()));
        }
        Ok(note)
    }

    pub async fn update_note(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        note_id: &str,
        request: &UpdateNoteRequest,
    ) -> Result<Note, SatchelError> {
        let mut set = Document::new();
        if let Some(title) = &request.title {
            set.insert("notes.$[n].title", title);
        }
        if let Some(date) = &request.date {
            set.insert("notes.$[n].date", date);
        }
        if let Some(content) = &request.content {
            set.insert("notes.$[n].content", content);
        }
        if let Some(tags) = &request.tags {
            set.insert("notes.$[n].tags", to_bson(tags)?);
        }
        let targets_note = !set.is_empty();
        set.insert("updatedAt", now_rfc3339());
        let filter = doc! { "_id": subject_id, "user": user, "notes.id": note_id };
        let mut options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        if targets_note {
            options.array_filters = Some(vec![doc! { "n.id": note_id }]);
        }
        let updated = self
            .subjects
            .find_one_and_update(filter, doc! { "$set": set }, Some(options))
            .await
            .map_err(mongo_err)?;
        match updated {
            Some(subject) => subject
                .notes
                .into_iter()
                .find(|note| note.id == note_id)
                .ok_or_else(|| entity_not_found("note", note_id)),
            None => Err(self.missing_note(user, subject_id, note_id).await),
        }
    }

    pub async fn delete_note(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        note_id: &str,
    ) -> Result<(), SatchelError> {
        let filter = doc! { "_id": subject_id, "user": user, "notes.id": note_id };
        let update = doc! {
            "$pull": { "notes": { "id": note_id } },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let result = self
            .subjects
            .update_one(filter, update, None)
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(self.missing_note(user, subject_id, note_id).await);
        }
        Ok(())
    }

    /// SHARED HELPERS ///

    async fn push_material(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry: Bson,
    ) -> Result<(), SatchelError> {
        let filter = doc! { "_id": subject_id, "user": user };
        let update = doc! {
            "$push": { kind.array_path(): entry },
            "$set": { "updatedAt": now_rfc3339() },
        };
        let result = self
            .subjects
            .update_one(filter, update, None)
            .await
            .map_err(mongo_err)?;
        if result.matched_count == 0 {
            return Err(SatchelError::SubjectNotFound(subject_id.to_hex()));
        }
        Ok(())
    }

    // single $set against the entry matched by id; the filter includes the
    // entry id so a vanished entry shows up as matched_count == 0 instead of
    // being silently skipped
    async fn update_material(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
        mut set: Document,
    ) -> Result<Subject, SatchelError> {
        let targets_entry = !set.is_empty();
        set.insert("updatedAt", now_rfc3339());
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            format!("{}.id", kind.array_path()): entry_id,
        };
        let mut options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        if targets_entry {
            options.array_filters = Some(vec![doc! { "entry.id": entry_id }]);
        }
        let updated = self
            .subjects
            .find_one_and_update(filter, doc! { "$set": set }, Some(options))
            .await
            .map_err(mongo_err)?;
        match updated {
            Some(subject) => Ok(subject),
            None => Err(self.missing_material(user, subject_id, kind, entry_id).await),
        }
    }

    async fn read_favorite(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
    ) -> Result<bool, SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            format!("{}.id", kind.array_path()): entry_id,
        };
        // positional projection returns just the matched entry
        let projection = doc! { format!("{}.$", kind.array_path()): 1 };
        let find_options = FindOneOptions::builder().projection(projection).build();
        let subject = self
            .subjects
            .find_one(filter, Some(find_options))
            .await
            .map_err(mongo_err)?;
        match subject {
            Some(subject) => {
                let flag = match kind {
                    MaterialKind::Lecture => subject
                        .course_materials
                        .lectures
                        .first()
                        .map(|lecture| lecture.is_favorite),
                    MaterialKind::Reading => subject
                        .course_materials
                        .readings
                        .first()
                        .map(|reading| reading.is_favorite),
                    MaterialKind::Assignment => subject
                        .course_materials
                        .assignments
                        .first()
                        .map(|assignment| assignment.is_favorite),
                };
                flag.ok_or_else(|| entity_not_found(kind.label(), entry_id))
            }
            None => Err(self.missing_material(user, subject_id, kind, entry_id).await),
        }
    }

    async fn subject_exists(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
    ) -> Result<bool, SatchelError> {
        let filter = doc! { "_id": subject_id, "user": user };
        let projection = doc! { "_id": 1 };
        let find_options = FindOneOptions::builder().projection(projection).build();
        let found = self
            .subjects
            .find_one(filter, Some(find_options))
            .await
            .map_err(mongo_err)?;
        Ok(found.is_some())
    }

    async fn material_exists(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
    ) -> Result<bool, SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            format!("{}.id", kind.array_path()): entry_id,
        };
        let projection = doc! { "_id": 1 };
        let find_options = FindOneOptions::builder().projection(projection).build();
        let found = self
            .subjects
            .find_one(filter, Some(find_options))
            .await
            .map_err(mongo_err)?;
        Ok(found.is_some())
    }

    async fn unit_exists(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
    ) -> Result<bool, SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units.id": unit_id,
        };
        let projection = doc! { "_id": 1 };
        let find_options = FindOneOptions::builder().projection(projection).build();
        let found = self
            .subjects
            .find_one(filter, Some(find_options))
            .await
            .map_err(mongo_err)?;
        Ok(found.is_some())
    }

    async fn chapter_exists(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
    ) -> Result<bool, SatchelError> {
        let filter = doc! {
            "_id": subject_id,
            "user": user,
            "courseMaterials.syllabus.units": {
                "$elemMatch": { "id": unit_id, "chapters.id": chapter_id }
            },
        };
        let projection = doc! { "_id": 1 };
        let find_options = FindOneOptions::builder().projection(projection).build();
        let found = self
            .subjects
            .find_one(filter, Some(find_options))
            .await
            .map_err(mongo_err)?;
        Ok(found.is_some())
    }

    // zero-match disambiguation: report the innermost thing that is missing

    async fn missing_material(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        kind: MaterialKind,
        entry_id: &str,
    ) -> SatchelError {
        match self.subject_exists(user, subject_id).await {
            Ok(true) => entity_not_found(kind.label(), entry_id),
            Ok(false) => SatchelError::SubjectNotFound(subject_id.to_hex()),
            Err(e) => e,
        }
    }

    async fn missing_unit(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
    ) -> SatchelError {
        match self.subject_exists(user, subject_id).await {
            Ok(true) => entity_not_found("unit", unit_id),
            Ok(false) => SatchelError::SubjectNotFound(subject_id.to_hex()),
            Err(e) => e,
        }
    }

    async fn missing_chapter(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
    ) -> SatchelError {
        match self.unit_exists(user, subject_id, unit_id).await {
            Ok(true) => entity_not_found("chapter", chapter_id),
            Ok(false) => self.missing_unit(user, subject_id, unit_id).await,
            Err(e) => e,
        }
    }

    async fn missing_subtopic(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        unit_id: &str,
        chapter_id: &str,
        subtopic_id: &str,
    ) -> SatchelError {
        match self
            .chapter_exists(user, subject_id, unit_id, chapter_id)
            .await
        {
            Ok(true) => entity_not_found("subtopic", subtopic_id),
            Ok(false) => {
                self.missing_chapter(user, subject_id, unit_id, chapter_id)
                    .await
            }
            Err(e) => e,
        }
    }

    async fn missing_note(
        &self,
        user: &ObjectId,
        subject_id: &ObjectId,
        note_id: &str,
    ) -> SatchelError {
        match self.subject_exists(user, subject_id).await {
            Ok(true) => entity_not_found("note", note_id),
            Ok(false) => SatchelError::SubjectNotFound(subject_id.to_hex()),
            Err(e) => e,
        }
    }
}

async fn connect() -> Result<Client, SatchelError> {
    let mut client_options = ClientOptions::parse(&**MONGODB_URI)
        .await
        .map_err(mongo_err)?;
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);
    Client::with_options(client_options).map_err(mongo_err)
}

fn mongo_err(e: mongodb::error::Error) -> SatchelError {
    SatchelError::MongoError(e.to_string())
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

fn entity_not_found(kind: &str, id: &str) -> SatchelError {
    SatchelError::EntityNotFound(String::from(kind), String::from(id))
}

fn to_bson<T: Serialize>(value: &T) -> Result<Bson, SatchelError> {
    bson::to_bson(value).map_err(|e| SatchelError::SerdeError(e.to_string()))
}

fn attachments_bson(attachments: &[Attachment]) -> Result<Bson, SatchelError> {
    let mut attachments = attachments.to_vec();
    for attachment in &mut attachments {
        attachment.ensure_id();
    }
    to_bson(&attachments)
}

fn find_unit(subject: &Subject, unit_id: &str) -> Option<Unit> {
    subject
        .course_materials
        .syllabus
        .units
        .iter()
        .find(|unit| unit.id == unit_id)
        .cloned()
}

fn find_chapter(subject: &Subject, unit_id: &str, chapter_id: &str) -> Option<Chapter> {
    subject
        .course_materials
        .syllabus
        .units
        .iter()
        .find(|unit| unit.id == unit_id)?
        .chapters
        .iter()
        .find(|chapter| chapter.id == chapter_id)
        .cloned()
}

fn find_subtopic(
    subject: &Subject,
    unit_id: &str,
    chapter_id: &str,
    subtopic_id: &str,
) -> Option<Subtopic> {
    subject
        .course_materials
        .syllabus
        .units
        .iter()
        .find(|unit| unit.id == unit_id)?
        .chapters
        .iter()
        .find(|chapter| chapter.id == chapter_id)?
        .subtopics
        .iter()
        .find(|subtopic| subtopic.id() == Some(subtopic_id))
        .cloned()
}
