//! Students repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::student::{CreateStudent, NewPlaceholder, Student, StudentQuery, UpdateStudent},
    services::policy::{ApparatusKind, BookKind, ItemKind},
};

#[derive(Clone)]
pub struct StudentsRepository {
    pool: Pool<Postgres>,
}

impl StudentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get student by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    /// Find a student by normalized badge UID, active or not
    pub async fn find_by_uid(&self, rfid_uid: &str) -> AppResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE rfid_uid = $1")
            .bind(rfid_uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    /// Check if a roll number is used by another student
    pub async fn roll_number_exists(&self, roll_number: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM students WHERE roll_number = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(roll_number)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Check if a badge UID is used by another student
    pub async fn rfid_uid_exists(&self, rfid_uid: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM students WHERE rfid_uid = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(rfid_uid)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// List students ordered by name
    pub async fn list(&self, query: &StudentQuery) -> AppResult<Vec<Student>> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students
            WHERE ($1 OR is_active)
              AND ($2::text IS NULL
                   OR LOWER(name) LIKE $2
                   OR LOWER(roll_number) LIKE $2
                   OR LOWER(rfid_uid) LIKE $2)
            ORDER BY name, id
            "#,
        )
        .bind(query.include_inactive.unwrap_or(false))
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    /// Insert a fully identified student; `rfid_uid` must already be normalized
    pub async fn create(&self, data: &CreateStudent) -> AppResult<Student> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (rfid_uid, name, roll_number, department, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.rfid_uid)
        .bind(data.name.trim())
        .bind(data.roll_number.trim())
        .bind(data.department.as_deref().unwrap_or(""))
        .bind(data.email.as_deref().unwrap_or(""))
        .fetch_one(&self.pool)
        .await?;
        Ok(student)
    }

    /// Insert a placeholder for an unknown badge.
    ///
    /// Two readers can see the same new card at once; the loser of the insert
    /// race picks up the row created by the winner.
    pub async fn create_placeholder(&self, placeholder: &NewPlaceholder) -> AppResult<Student> {
        let inserted = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (rfid_uid, name, roll_number, department, is_inside, is_placeholder)
            VALUES ($1, $2, $3, $4, FALSE, TRUE)
            ON CONFLICT (rfid_uid) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&placeholder.rfid_uid)
        .bind(&placeholder.name)
        .bind(&placeholder.roll_number)
        .bind(&placeholder.department)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(student) => Ok(student),
            None => self
                .find_by_uid(&placeholder.rfid_uid)
                .await?
                .ok_or_else(|| AppError::Internal("Placeholder vanished after insert".to_string())),
        }
    }

    /// Complete a placeholder in place, keeping its id, presence and history
    pub async fn merge_placeholder(&self, id: i32, data: &CreateStudent) -> AppResult<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET name = $2, roll_number = $3, department = $4, email = $5,
                is_placeholder = FALSE, is_active = TRUE
            WHERE id = $1 AND is_placeholder
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(data.roll_number.trim())
        .bind(data.department.as_deref().unwrap_or(""))
        .bind(data.email.as_deref().unwrap_or(""))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("RFID UID already registered".to_string()))
    }

    /// Update a student; `rfid_uid` must already be normalized
    pub async fn update(&self, id: i32, data: &UpdateStudent) -> AppResult<Student> {
        // $1 is the id
        let mut sets: Vec<String> = Vec::new();

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, sets.len() + 2));
                }
            };
        }

        add_field!(data.rfid_uid, "rfid_uid");
        add_field!(data.name, "name");
        add_field!(data.roll_number, "roll_number");
        add_field!(data.department, "department");
        add_field!(data.email, "email");
        add_field!(data.is_active, "is_active");

        if data.sets_identity() {
            sets.push("is_placeholder = FALSE".to_string());
        }
        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let name = data.name.as_deref().map(str::trim);
        let roll_number = data.roll_number.as_deref().map(str::trim);

        let query = format!("UPDATE students SET {} WHERE id = $1 RETURNING *", sets.join(", "));
        let mut builder = sqlx::query_as::<_, Student>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.rfid_uid);
        bind_field!(name);
        bind_field!(roll_number);
        bind_field!(data.department);
        bind_field!(data.email);
        bind_field!(data.is_active);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    /// Delete a student with its loans and attendance history.
    ///
    /// Copies held by the student's active loans go back on the shelf first so
    /// that catalog counters keep matching the remaining active loans.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        release_active_loans::<BookKind>(&mut tx, id).await?;
        release_active_loans::<ApparatusKind>(&mut tx, id).await?;

        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Student with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Lock a student row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    /// Set the global presence flag
    pub async fn set_inside(&self, conn: &mut PgConnection, id: i32, is_inside: bool) -> AppResult<()> {
        sqlx::query("UPDATE students SET is_inside = $2 WHERE id = $1")
            .bind(id)
            .bind(is_inside)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Count students currently inside
    pub async fn count_inside(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE is_inside")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count active students
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE is_active")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn release_active_loans<K: ItemKind>(conn: &mut PgConnection, student_id: i32) -> AppResult<()> {
    let query = format!(
        r#"
        UPDATE {items} i
        SET {available} = i.{available} + held.n
        FROM (
            SELECT item_id, COUNT(*)::int AS n
            FROM {loans}
            WHERE student_id = $1 AND returned_at IS NULL
            GROUP BY item_id
        ) held
        WHERE i.id = held.item_id
        "#,
        items = K::ITEM_TABLE,
        available = K::AVAILABLE_COLUMN,
        loans = K::LOAN_TABLE,
    );
    sqlx::query(&query).bind(student_id).execute(conn).await?;
    Ok(())
}
