// ==========================================
// 生产执行系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 统一建表入口，保证 schema 幂等创建
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间戳存储格式（UTC）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 幂等建表
///
/// 约束:
/// - materials.quantity_in_stock 带 CHECK(>= 0)，库存永不为负
/// - stage_templates 对 (product_id, name) 与 (product_id, order_in_chain) 唯一
/// - deduction_events 对 (task_id, cycle, material_id) 唯一，同一周期最多扣减一次
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS principals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            last_name TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            patronymic TEXT,
            role TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            unit TEXT NOT NULL,
            quantity_in_stock REAL NOT NULL DEFAULT 0 CHECK (quantity_in_stock >= 0)
        );

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS stage_templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id),
            name TEXT NOT NULL,
            order_in_chain INTEGER NOT NULL CHECK (order_in_chain > 0),
            norm_time_minutes INTEGER NOT NULL CHECK (norm_time_minutes > 0),
            UNIQUE(product_id, name),
            UNIQUE(product_id, order_in_chain)
        );

        CREATE TABLE IF NOT EXISTS stage_material_requirements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stage_template_id INTEGER NOT NULL REFERENCES stage_templates(id) ON DELETE CASCADE,
            material_id INTEGER NOT NULL REFERENCES materials(id),
            quantity_needed REAL NOT NULL CHECK (quantity_needed > 0)
        );

        CREATE TABLE IF NOT EXISTS production_orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_name TEXT NOT NULL,
            product_id INTEGER NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            start_date TEXT NOT NULL,
            deadline_date TEXT NOT NULL,
            status TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS production_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL REFERENCES production_orders(id),
            seq_no INTEGER NOT NULL,
            stage_name TEXT NOT NULL,
            status TEXT NOT NULL,
            responsible_principal_id INTEGER REFERENCES principals(id),
            start_time_actual TEXT,
            end_time_actual TEXT,
            cycle INTEGER NOT NULL DEFAULT 1,
            UNIQUE(order_id, seq_no)
        );

        CREATE TABLE IF NOT EXISTS deduction_events (
            event_id TEXT PRIMARY KEY,
            task_id INTEGER NOT NULL REFERENCES production_tasks(id),
            cycle INTEGER NOT NULL,
            order_id INTEGER NOT NULL REFERENCES production_orders(id),
            stage_name TEXT NOT NULL,
            material_id INTEGER NOT NULL REFERENCES materials(id),
            amount REAL NOT NULL,
            deducted_at TEXT NOT NULL,
            UNIQUE(task_id, cycle, material_id)
        );

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            order_id INTEGER,
            task_id INTEGER,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_order ON production_tasks(order_id, seq_no);
        CREATE INDEX IF NOT EXISTS idx_orders_status ON production_orders(status);
        CREATE INDEX IF NOT EXISTS idx_deduction_task ON deduction_events(task_id, cycle);
        CREATE INDEX IF NOT EXISTS idx_action_ts ON action_log(action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_type_ts ON action_log(action_type, action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
