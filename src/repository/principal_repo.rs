// ==========================================
// 生产执行系统 - 人员数据仓储
// ==========================================

use crate::domain::principal::{NewPrincipal, Principal};
use crate::repository::codec::parse_enum;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const PRINCIPAL_COLUMNS: &str = "id, username, last_name, first_name, patronymic, role, is_active";

pub struct PrincipalRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PrincipalRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> SqliteResult<Principal> {
        Ok(Principal {
            id: row.get(0)?,
            username: row.get(1)?,
            last_name: row.get(2)?,
            first_name: row.get(3)?,
            patronymic: row.get(4)?,
            role: parse_enum(5, &row.get::<_, String>(5)?)?,
            is_active: row.get::<_, i64>(6)? != 0,
        })
    }

    pub fn insert(&self, principal: &NewPrincipal) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO principals (username, last_name, first_name, patronymic, role, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            "#,
            params![
                principal.username,
                principal.last_name,
                principal.first_name,
                principal.patronymic,
                principal.role.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, principal_id: i64) -> RepositoryResult<Option<Principal>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, principal_id)
    }

    pub fn find_by_id_tx(
        conn: &Connection,
        principal_id: i64,
    ) -> RepositoryResult<Option<Principal>> {
        let sql = format!("SELECT {} FROM principals WHERE id = ?1", PRINCIPAL_COLUMNS);
        let principal = conn
            .query_row(&sql, params![principal_id], Self::map_row)
            .optional()?;
        Ok(principal)
    }

    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Principal>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM principals WHERE username = ?1", PRINCIPAL_COLUMNS);
        let principal = conn
            .query_row(&sql, params![username], Self::map_row)
            .optional()?;
        Ok(principal)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Principal>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM principals ORDER BY id", PRINCIPAL_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let principals = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Principal>>>()?;
        Ok(principals)
    }

    /// 停用人员（停用后不可再被派工）
    pub fn deactivate(&self, principal_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE principals SET is_active = 0 WHERE id = ?1",
            params![principal_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Principal", principal_id));
        }
        Ok(())
    }
}
