//! Student registry: registration, placeholder takeover and CRUD

use crate::{
    error::{AppError, AppResult},
    models::student::{
        normalize_rfid_uid, CreateStudent, NewPlaceholder, Registration, Student, StudentQuery,
        UpdateStudent,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct StudentsService {
    repository: Repository,
}

impl StudentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &StudentQuery) -> AppResult<Vec<Student>> {
        self.repository.students.list(query).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Student> {
        self.repository.students.get_by_id(id).await
    }

    /// Register a student, or complete the placeholder created for the same badge
    pub async fn register(&self, mut data: CreateStudent) -> AppResult<Registration> {
        data.rfid_uid = normalize_rfid_uid(&data.rfid_uid)?;
        let roll_number = data.roll_number.trim().to_string();

        match self.repository.students.find_by_uid(&data.rfid_uid).await? {
            Some(existing) if existing.is_placeholder => {
                self.ensure_roll_number_free(&roll_number, Some(existing.id)).await?;
                let student = self
                    .repository
                    .students
                    .merge_placeholder(existing.id, &data)
                    .await?;
                tracing::info!(
                    student_id = student.id,
                    rfid_uid = %student.rfid_uid,
                    "Placeholder merged into registered student"
                );
                Ok(Registration::Merged(student))
            }
            Some(_) => Err(AppError::Conflict("RFID UID already registered".to_string())),
            None => {
                self.ensure_roll_number_free(&roll_number, None).await?;
                let student = self.repository.students.create(&data).await?;
                tracing::info!(
                    student_id = student.id,
                    rfid_uid = %student.rfid_uid,
                    "Student registered"
                );
                Ok(Registration::Created(student))
            }
        }
    }

    /// Create the placeholder for a badge seen for the first time
    pub async fn auto_register(&self, rfid_uid: &str) -> AppResult<Student> {
        let student = self
            .repository
            .students
            .create_placeholder(&NewPlaceholder::for_uid(rfid_uid))
            .await?;
        tracing::info!(student_id = student.id, rfid_uid, "Unknown badge auto-registered");
        Ok(student)
    }

    pub async fn update(&self, id: i32, mut data: UpdateStudent) -> AppResult<Student> {
        self.repository.students.get_by_id(id).await?;

        if let Some(ref raw) = data.rfid_uid {
            let uid = normalize_rfid_uid(raw)?;
            if self.repository.students.rfid_uid_exists(&uid, Some(id)).await? {
                return Err(AppError::Conflict("RFID UID already registered".to_string()));
            }
            data.rfid_uid = Some(uid);
        }
        if let Some(ref roll_number) = data.roll_number {
            self.ensure_roll_number_free(roll_number.trim(), Some(id)).await?;
        }

        self.repository.students.update(id, &data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.students.delete(id).await?;
        tracing::info!(student_id = id, "Student deleted");
        Ok(())
    }

    async fn ensure_roll_number_free(&self, roll_number: &str, exclude_id: Option<i32>) -> AppResult<()> {
        if self
            .repository
            .students
            .roll_number_exists(roll_number, exclude_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Roll number {} already exists",
                roll_number
            )));
        }
        Ok(())
    }
}
