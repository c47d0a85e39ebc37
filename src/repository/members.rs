//! Members repository: memberships and the user accounts they wrap

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, UpdateMember},
};

const MEMBER_SELECT: &str = r#"
    SELECT m.id, m.user_id, u.username, u.email, u.first_name, u.last_name,
           m.membership_date
    FROM members m
    JOIN users u ON u.id = m.user_id
"#;

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all members
    pub async fn list(&self) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(&format!("{} ORDER BY u.username", MEMBER_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!("{} WHERE m.id = $1", MEMBER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Create the user account and its membership in one transaction
    pub async fn create(&self, data: &CreateMember) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (username, email, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from(e)
                .on_unique_violation(format!("Username {} is already taken", data.username))
        })?;

        let member_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO members (user_id) VALUES ($1) RETURNING id",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(member_id).await
    }

    /// Update the user account behind a member
    pub async fn update(&self, id: i32, data: &UpdateMember) -> AppResult<Member> {
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name)
            WHERE id = (SELECT user_id FROM members WHERE id = $1)
            "#,
        )
        .bind(id)
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from(e).on_unique_violation("Username is already taken"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Delete a member by removing its user account (cascades to the
    /// membership and its loans)
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = (SELECT user_id FROM members WHERE id = $1)",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        Ok(())
    }
}
