//! Database repository for video requests, votes and users.
//!
//! Multi-statement writes run in a transaction so each operation is atomic.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{Sqlite, SqliteExecutor, SqliteRow};
use sqlx::{QueryBuilder, Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateVideoRequest, LoginRequest, RequestStatus, SortBy, UpdateVideoRequest, User, VideoRef,
    VideoRequest, VoteType, Votes,
};

/// Columns of `video_requests`, none of which collide with `votes` columns.
const REQUEST_COLUMNS: &str = "id, topic_title, topic_details, expected_result, target_level, \
    status, author_id, author_name, author_email, submit_date, video_ref_link, video_ref_date";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, author_name, author_email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Return the user registered under the email, creating it on first login.
    ///
    /// A repeated login keeps the id and refreshes the display name.
    pub async fn login(&self, request: &LoginRequest) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = timestamp(&now());

        let row = sqlx::query(
            r#"INSERT INTO users (id, author_name, author_email, created_at) VALUES (?, ?, ?, ?)
               ON CONFLICT(author_email) DO UPDATE SET author_name = excluded.author_name
               RETURNING id, author_name, author_email, created_at"#,
        )
        .bind(&id)
        .bind(request.author_name.trim())
        .bind(request.author_email.trim().to_lowercase())
        .bind(&created_at)
        .fetch_one(&self.pool)
        .await?;

        user_from_row(&row)
    }

    // ==================== VIDEO REQUEST OPERATIONS ====================

    /// Create a new request, copying author details from the referenced user.
    pub async fn create_request(
        &self,
        request: &CreateVideoRequest,
    ) -> Result<VideoRequest, AppError> {
        let author = match &request.author_id {
            Some(author_id) => Some(self.get_user(author_id).await?.ok_or_else(|| {
                AppError::Validation(format!("Author {} does not exist", author_id))
            })?),
            None => None,
        };

        let id = uuid::Uuid::new_v4().to_string();
        let submit_date = now();
        let status = RequestStatus::default();

        sqlx::query(
            r#"INSERT INTO video_requests (
                id, topic_title, topic_title_folded, topic_details, expected_result,
                target_level, status, author_id, author_name, author_email, submit_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.topic_title)
        .bind(request.topic_title.to_lowercase())
        .bind(&request.topic_details)
        .bind(&request.expected_result)
        .bind(request.target_level.as_str())
        .bind(status.as_str())
        .bind(author.as_ref().map(|u| u.id.as_str()))
        .bind(author.as_ref().map(|u| u.author_name.as_str()))
        .bind(author.as_ref().map(|u| u.author_email.as_str()))
        .bind(timestamp(&submit_date))
        .execute(&self.pool)
        .await?;

        Ok(VideoRequest {
            id,
            topic_title: request.topic_title.clone(),
            topic_details: request.topic_details.clone(),
            expected_result: request.expected_result.clone(),
            target_level: request.target_level,
            status,
            author_id: author.as_ref().map(|u| u.id.clone()),
            author_name: author.as_ref().map(|u| u.author_name.clone()),
            author_email: author.map(|u| u.author_email),
            submit_date,
            votes: Votes::default(),
            video_ref: None,
        })
    }

    /// List all requests in the given order, newest first unless sorted by score.
    pub async fn list_requests(
        &self,
        sort_by: SortBy,
        limit: Option<u32>,
    ) -> Result<Vec<VideoRequest>, AppError> {
        self.query_requests(None, sort_by, limit).await
    }

    /// List requests whose title contains `key`, ignoring case.
    pub async fn search_requests(
        &self,
        key: &str,
        sort_by: SortBy,
        limit: Option<u32>,
    ) -> Result<Vec<VideoRequest>, AppError> {
        self.query_requests(Some(key), sort_by, limit).await
    }

    async fn query_requests(
        &self,
        title_filter: Option<&str>,
        sort_by: SortBy,
        limit: Option<u32>,
    ) -> Result<Vec<VideoRequest>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {}, COALESCE(SUM(CASE v.direction WHEN 'ups' THEN 1 WHEN 'downs' THEN -1 ELSE 0 END), 0) AS score \
             FROM video_requests r LEFT JOIN votes v ON v.request_id = r.id",
            REQUEST_COLUMNS
        ));

        // Literal substring match against the lowercased copy of the title
        if let Some(key) = title_filter {
            builder
                .push(" WHERE instr(r.topic_title_folded, ")
                .push_bind(key.to_lowercase())
                .push(") > 0");
        }

        builder.push(" GROUP BY r.id ORDER BY ");
        builder.push(match sort_by {
            SortBy::NewlyAdded => "r.submit_date DESC, r.rowid DESC",
            SortBy::TopVoted => "score DESC, r.submit_date DESC, r.rowid DESC",
        });

        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<String, _>("id")?);
        }
        let mut votes = self.load_votes(&ids).await?;

        let mut requests = Vec::with_capacity(rows.len());
        for (row, id) in rows.iter().zip(&ids) {
            requests.push(request_from_row(row, votes.remove(id).unwrap_or_default())?);
        }
        Ok(requests)
    }

    /// Get a request by ID.
    pub async fn get_request(&self, id: &str) -> Result<Option<VideoRequest>, AppError> {
        let sql = format!("SELECT {} FROM video_requests WHERE id = ?", REQUEST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let votes = fetch_votes(&self.pool, id).await?;
        request_from_row(&row, votes).map(Some)
    }

    /// Set the status of a request and its fulfillment link.
    ///
    /// The link date is stamped only when a link is given; an empty link clears it.
    pub async fn update_request(
        &self,
        id: &str,
        request: &UpdateVideoRequest,
    ) -> Result<VideoRequest, AppError> {
        let link = request.video_link();
        let link_date = link.map(|_| timestamp(&now()));

        let result = sqlx::query(
            "UPDATE video_requests SET status = ?, video_ref_link = ?, video_ref_date = ? WHERE id = ?",
        )
        .bind(request.status.as_str())
        .bind(link)
        .bind(&link_date)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Video request {} not found", id)));
        }

        self.get_request(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video request {} not found", id)))
    }

    /// Toggle a voter's vote in one direction, dropping any vote in the other.
    ///
    /// The transaction opens with a write so it holds SQLite's write lock for the
    /// whole read-modify-write; concurrent toggles are serialized.
    pub async fn toggle_vote(
        &self,
        request_id: &str,
        direction: VoteType,
        voter_id: &str,
    ) -> Result<Votes, AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM votes WHERE request_id = ? AND voter_id = ? AND direction = ?",
        )
        .bind(request_id)
        .bind(voter_id)
        .bind(direction.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let exists = sqlx::query("SELECT 1 FROM video_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        if !exists {
            return Err(AppError::NotFound(format!(
                "Video request {} not found",
                request_id
            )));
        }

        if removed == 0 {
            sqlx::query(
                r#"INSERT INTO votes (request_id, voter_id, direction, voted_at) VALUES (?, ?, ?, ?)
                   ON CONFLICT(request_id, voter_id)
                   DO UPDATE SET direction = excluded.direction, voted_at = excluded.voted_at"#,
            )
            .bind(request_id)
            .bind(voter_id)
            .bind(direction.as_str())
            .bind(timestamp(&now()))
            .execute(&mut *tx)
            .await?;
        }

        let votes = fetch_votes(&mut *tx, request_id).await?;
        tx.commit().await?;

        Ok(votes)
    }

    /// Delete a request together with its votes.
    pub async fn delete_request(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM video_requests WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Video request {} not found", id)));
        }

        Ok(())
    }

    /// Load vote membership for many requests with one query.
    async fn load_votes(&self, request_ids: &[String]) -> Result<HashMap<String, Votes>, AppError> {
        let mut votes: HashMap<String, Votes> = HashMap::new();
        if request_ids.is_empty() {
            return Ok(votes);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT request_id, voter_id, direction FROM votes WHERE request_id IN (");
        let mut separated = builder.separated(", ");
        for id in request_ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        for row in &rows {
            let request_id: String = row.try_get("request_id")?;
            let (direction, voter_id) = vote_from_row(row)?;
            votes.entry(request_id).or_default().insert(direction, voter_id);
        }

        Ok(votes)
    }
}

async fn fetch_votes<'e, E>(executor: E, request_id: &str) -> Result<Votes, AppError>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query("SELECT voter_id, direction FROM votes WHERE request_id = ?")
        .bind(request_id)
        .fetch_all(executor)
        .await?;

    let mut votes = Votes::default();
    for row in &rows {
        let (direction, voter_id) = vote_from_row(row)?;
        votes.insert(direction, voter_id);
    }
    Ok(votes)
}

// Helper functions for row conversion

fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    Ok(User {
        id: row.try_get("id")?,
        author_name: row.try_get("author_name")?,
        author_email: row.try_get("author_email")?,
        created_at: row.try_get("created_at")?,
    })
}

fn vote_from_row(row: &SqliteRow) -> Result<(VoteType, String), AppError> {
    let direction: String = row.try_get("direction")?;
    let direction = direction.parse().map_err(AppError::Internal)?;
    Ok((direction, row.try_get("voter_id")?))
}

fn request_from_row(row: &SqliteRow, votes: Votes) -> Result<VideoRequest, AppError> {
    let target_level: String = row.try_get("target_level")?;
    let status: String = row.try_get("status")?;
    let video_ref_link: Option<String> = row.try_get("video_ref_link")?;
    let video_ref_date: Option<DateTime<Utc>> = row.try_get("video_ref_date")?;

    Ok(VideoRequest {
        id: row.try_get("id")?,
        topic_title: row.try_get("topic_title")?,
        topic_details: row.try_get("topic_details")?,
        expected_result: row.try_get("expected_result")?,
        target_level: target_level.parse().map_err(AppError::Internal)?,
        status: status.parse().map_err(AppError::Internal)?,
        author_id: row.try_get("author_id")?,
        author_name: row.try_get("author_name")?,
        author_email: row.try_get("author_email")?,
        submit_date: row.try_get("submit_date")?,
        votes,
        video_ref: video_ref_link
            .zip(video_ref_date)
            .map(|(link, date)| VideoRef { link, date }),
    })
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text, so that text order equals time order.
fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
