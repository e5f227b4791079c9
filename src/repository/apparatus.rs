//! Lab apparatus repository

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::apparatus::{Apparatus, CreateApparatus, UpdateApparatus},
};

#[derive(Clone)]
pub struct ApparatusRepository {
    pool: Pool<Postgres>,
}

impl ApparatusRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List apparatus, optionally restricted to one category
    pub async fn list(&self, category: Option<&str>) -> AppResult<Vec<Apparatus>> {
        let rows = sqlx::query_as::<_, Apparatus>(
            r#"
            SELECT * FROM apparatus
            WHERE $1::text IS NULL OR category = $1
            ORDER BY category, name, id
            "#,
        )
        .bind(category.map(str::trim).filter(|c| !c.is_empty()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Apparatus> {
        sqlx::query_as::<_, Apparatus>("SELECT * FROM apparatus WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Apparatus with id {} not found", id)))
    }

    pub async fn create(&self, data: &CreateApparatus) -> AppResult<Apparatus> {
        let total = data.total_quantity.unwrap_or(1);
        let row = sqlx::query_as::<_, Apparatus>(
            r#"
            INSERT INTO apparatus (name, category, total_quantity, available_quantity, damage_fine)
            VALUES ($1, $2, $3, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.category.trim())
        .bind(total)
        .bind(data.damage_fine.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update apparatus; a new total shifts the available count by the same delta
    pub async fn update(&self, id: i32, data: &UpdateApparatus) -> AppResult<Apparatus> {
        let mut tx = self.pool.begin().await?;

        let current =
            sqlx::query_as::<_, Apparatus>("SELECT * FROM apparatus WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Apparatus with id {} not found", id)))?;

        let available = match data.total_quantity {
            Some(total) => {
                let available = current.available_quantity + (total - current.total_quantity);
                if available < 0 {
                    return Err(AppError::Conflict(format!(
                        "Cannot set total_quantity to {}: {} units are on loan",
                        total,
                        current.total_quantity - current.available_quantity
                    )));
                }
                Some(available)
            }
            None => None,
        };

        // $1 is the id
        let mut sets: Vec<String> = Vec::new();

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, sets.len() + 2));
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.category, "category");
        add_field!(data.total_quantity, "total_quantity");
        add_field!(available, "available_quantity");
        add_field!(data.damage_fine, "damage_fine");

        if sets.is_empty() {
            return Ok(current);
        }

        let query = format!("UPDATE apparatus SET {} WHERE id = $1 RETURNING *", sets.join(", "));
        let mut builder = sqlx::query_as::<_, Apparatus>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.category);
        bind_field!(data.total_quantity);
        bind_field!(available);
        bind_field!(data.damage_fine);

        let row = builder.fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Delete apparatus that was never lent
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let has_loans: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM apparatus_loans WHERE item_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if has_loans {
            return Err(AppError::Conflict(
                "Apparatus has borrow history and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM apparatus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Apparatus with id {} not found", id)));
        }
        Ok(())
    }
}
