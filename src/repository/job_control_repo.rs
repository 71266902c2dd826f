// ==========================================
// 仓储运营后台 - 批处理台账仓储
// ==========================================
// 每次运行一行: RUNNING 登记 → 进度更新 → SUCCESS / FAILED 收尾
// ==========================================

use crate::domain::job::JobControl;
use crate::domain::types::JobStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"job_id, batch_code, process_name, status, processed_records,
       progress_current, progress_total, started_at, ended_at, error_message, created_at"#;

// ==========================================
// JobControlRepository - 批处理台账仓储
// ==========================================
pub struct JobControlRepository {
    conn: Arc<Mutex<Connection>>,
}

impl JobControlRepository {
    /// 创建新的 JobControlRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记一次运行 (RUNNING, started_at=now)
    ///
    /// # 返回
    /// - `Ok(job_id)`: 台账行ID
    pub fn start_run(
        &self,
        process_name: &str,
        batch_code: Option<&str>,
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let job_id = Uuid::new_v4().to_string();

        conn.execute(
            r#"INSERT INTO job_control (
                job_id, batch_code, process_name, status, started_at, created_at
            ) VALUES (?, ?, ?, 'RUNNING', datetime('now'), datetime('now'))"#,
            params![&job_id, batch_code, process_name],
        )?;

        Ok(job_id)
    }

    /// 更新进度
    pub fn update_progress(
        &self,
        job_id: &str,
        progress_current: i64,
        progress_total: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE job_control SET progress_current = ?, progress_total = ? WHERE job_id = ?",
            params![progress_current, progress_total, job_id],
        )?;
        Ok(())
    }

    /// 正常收尾 (SUCCESS)
    pub fn finish_success(&self, job_id: &str, processed_records: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE job_control
               SET status = 'SUCCESS',
                   processed_records = ?,
                   progress_current = progress_total,
                   ended_at = datetime('now')
               WHERE job_id = ?"#,
            params![processed_records, job_id],
        )?;
        Ok(())
    }

    /// 异常收尾 (FAILED + 错误信息)
    pub fn finish_failed(&self, job_id: &str, error_message: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE job_control
               SET status = 'FAILED',
                   error_message = ?,
                   ended_at = datetime('now')
               WHERE job_id = ?"#,
            params![error_message, job_id],
        )?;
        Ok(())
    }

    /// 按ID查询台账行
    pub fn find_by_id(&self, job_id: &str) -> RepositoryResult<Option<JobControl>> {
        let conn = self.get_conn()?;

        conn.query_row(
            &format!("SELECT {} FROM job_control WHERE job_id = ?", SELECT_COLUMNS),
            params![job_id],
            |row| Self::map_row(row),
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// 按批次代码查询台账行
    pub fn find_by_batch_code(&self, batch_code: &str) -> RepositoryResult<Option<JobControl>> {
        let conn = self.get_conn()?;

        conn.query_row(
            &format!(
                "SELECT {} FROM job_control WHERE batch_code = ? ORDER BY created_at DESC LIMIT 1",
                SELECT_COLUMNS
            ),
            params![batch_code],
            |row| Self::map_row(row),
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// 查询某处理名的最近一次运行
    pub fn find_latest_by_process(&self, process_name: &str) -> RepositoryResult<Option<JobControl>> {
        let conn = self.get_conn()?;

        conn.query_row(
            &format!(
                "SELECT {} FROM job_control WHERE process_name = ? ORDER BY created_at DESC LIMIT 1",
                SELECT_COLUMNS
            ),
            params![process_name],
            |row| Self::map_row(row),
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// 查询最近的运行记录 (运维画面用)
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<JobControl>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM job_control ORDER BY created_at DESC LIMIT ?",
            SELECT_COLUMNS
        ))?;

        let jobs = stmt
            .query_map(params![limit], |row| Self::map_row(row))?
            .collect::<Result<Vec<JobControl>, _>>()?;

        Ok(jobs)
    }

    /// 映射数据库行到 JobControl
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<JobControl> {
        let status_str: String = row.get(3)?;

        Ok(JobControl {
            job_id: row.get(0)?,
            batch_code: row.get(1)?,
            process_name: row.get(2)?,
            status: JobStatus::from_db_str(&status_str),
            processed_records: row.get(4)?,
            progress_current: row.get(5)?,
            progress_total: row.get(6)?,
            started_at: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
            ended_at: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
            error_message: row.get(9)?,
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(10)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
            })?,
        })
    }
}
