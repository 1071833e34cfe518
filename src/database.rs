use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::models::*;

use crate::log_db_operation;

/// Characters of study material kept with each history row.
pub const EXCERPT_CHARS: usize = 250;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives in a single connection's shared cache;
        // one connection avoids table locks between pooled handles.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Database { pool };
        db.migrate().await?;
        log_db_operation!(info, "migrate", "schema ready");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                format TEXT NOT NULL,
                score INTEGER NOT NULL,
                total INTEGER NOT NULL,
                study_material_excerpt TEXT,
                timestamp TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                options TEXT,
                correct_answer TEXT,
                user_answer TEXT,
                FOREIGN KEY (quiz_id) REFERENCES quiz_history(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_quiz_questions_quiz_id ON quiz_questions(quiz_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Stores a finished quiz and its questions atomically, returning the new quiz id.
    pub async fn save_quiz(&self, request: &SaveQuizRequest) -> Result<i64> {
        let excerpt: String = request.study_material.chars().take(EXCERPT_CHARS).collect();
        let timestamp = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let quiz_id = sqlx::query(
            r#"
            INSERT INTO quiz_history (format, score, total, study_material_excerpt, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&request.format)
        .bind(request.score)
        .bind(request.total)
        .bind(&excerpt)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for question in &request.questions {
            let options_json = question
                .options
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO quiz_questions (quiz_id, question, options, correct_answer, user_answer)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(quiz_id)
            .bind(&question.question)
            .bind(options_json)
            .bind(&question.answer)
            .bind(&question.user_answer)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log_db_operation!(debug, "save_quiz", quiz_id = quiz_id, count = request.questions.len());
        Ok(quiz_id)
    }

    pub async fn get_all_quizzes(&self) -> Result<Vec<QuizHistoryRecord>> {
        let rows = sqlx::query("SELECT * FROM quiz_history ORDER BY timestamp DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;

        let quizzes = rows
            .iter()
            .map(row_to_history)
            .collect::<Result<Vec<_>>>()?;

        log_db_operation!(debug, "get_all_quizzes", count = quizzes.len());
        Ok(quizzes)
    }

    pub async fn get_quiz(&self, id: i64) -> Result<Option<QuizHistoryRecord>> {
        let row = sqlx::query("SELECT * FROM quiz_history WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_history).transpose()
    }

    pub async fn get_quiz_questions(&self, quiz_id: i64) -> Result<Vec<StoredQuestion>> {
        let rows = sqlx::query("SELECT * FROM quiz_questions WHERE quiz_id = ?1 ORDER BY id ASC")
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let options = row
                .get::<Option<String>, _>("options")
                .map(|json| serde_json::from_str::<Vec<String>>(&json))
                .transpose()?;

            questions.push(StoredQuestion {
                id: row.get("id"),
                quiz_id: row.get("quiz_id"),
                question: row.get("question"),
                options,
                correct_answer: row.get("correct_answer"),
                user_answer: row.get("user_answer"),
            });
        }

        log_db_operation!(debug, "get_quiz_questions", quiz_id = quiz_id, count = questions.len());
        Ok(questions)
    }

    pub async fn delete_quiz(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quiz_history WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_history(row: &SqliteRow) -> Result<QuizHistoryRecord> {
    Ok(QuizHistoryRecord {
        id: row.get("id"),
        format: row.get("format"),
        score: row.get("score"),
        total: row.get("total"),
        study_material_excerpt: row.get("study_material_excerpt"),
        timestamp: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("timestamp"))?
            .with_timezone(&Utc),
    })
}
