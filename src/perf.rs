// ==========================================
// 生产执行系统 - 读模型耗时与 SQL 观测
// ==========================================
// PerfGuard 包住一次读模型计算（甘特、齐套、报表），
// 结束时输出: 耗时、语句数、慢语句数
// 统计按线程累计，嵌套 Guard 各自取差值
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const ENV_PERF_SQL: &str = "PRODUCTION_MES_PERF_SQL";
pub const ENV_SLOW_SQL_MS: &str = "PRODUCTION_MES_SLOW_SQL_MS";

const SQL_PREVIEW_CHARS: usize = 420;

static OBSERVING: AtomicBool = AtomicBool::new(false);
static SLOW_MS: AtomicU64 = AtomicU64::new(0);

/// 线程内 SQL 统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SqlStats {
    open_guards: u32,
    statements: u64,
    slow_statements: u64,
}

thread_local! {
    static STATS: Cell<SqlStats> = Cell::new(SqlStats::default());
}

fn update_stats(f: impl FnOnce(&mut SqlStats)) {
    STATS.with(|cell| {
        let mut stats = cell.get();
        f(&mut stats);
        cell.set(stats);
    });
}

fn current_stats() -> SqlStats {
    STATS.with(Cell::get)
}

/// SQL 观测开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub enabled: bool,
    pub slow_sql_ms: u64,
}

impl PerfSettings {
    /// 从环境变量读取
    ///
    /// - 未设置 `PRODUCTION_MES_PERF_SQL` 时 Debug 构建开启、Release 构建关闭
    /// - `PRODUCTION_MES_SLOW_SQL_MS` 慢语句阈值，默认 Debug 50ms / Release 200ms
    pub fn from_env() -> Self {
        let enabled = std::env::var(ENV_PERF_SQL)
            .map(|v| flag_on(&v))
            .unwrap_or(cfg!(debug_assertions));
        let default_slow = if cfg!(debug_assertions) { 50 } else { 200 };
        let slow_sql_ms = std::env::var(ENV_SLOW_SQL_MS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(default_slow);
        Self { enabled, slow_sql_ms }
    }
}

fn flag_on(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    ["1", "true", "yes", "on"].contains(&v.as_str())
}

/// 单行化并按字符截断 SQL
fn sql_preview(sql: &str) -> String {
    let flat: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SQL_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

/// 在连接上挂载 trace/profile 回调（关闭时卸载）
pub fn install_sqlite_tracing(conn: &mut Connection, settings: PerfSettings) {
    OBSERVING.store(settings.enabled, Ordering::Relaxed);
    SLOW_MS.store(settings.slow_sql_ms, Ordering::Relaxed);

    if settings.enabled {
        conn.trace(Some(on_statement));
        conn.profile(Some(on_statement_finished));
    } else {
        conn.trace(None);
        conn.profile(None);
    }
}

fn on_statement(_sql: &str) {
    if OBSERVING.load(Ordering::Relaxed) {
        update_stats(|s| {
            if s.open_guards > 0 {
                s.statements = s.statements.saturating_add(1);
            }
        });
    }
}

fn on_statement_finished(sql: &str, elapsed: Duration) {
    if !OBSERVING.load(Ordering::Relaxed) {
        return;
    }
    let slow_ms = SLOW_MS.load(Ordering::Relaxed);
    let ms = elapsed.as_millis() as u64;
    if slow_ms == 0 || ms < slow_ms {
        return;
    }

    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %sql_preview(sql), "慢SQL");
    update_stats(|s| {
        if s.open_guards > 0 {
            s.slow_statements = s.slow_statements.saturating_add(1);
        }
    });
}

/// 读模型计时 Guard
///
/// ```ignore
/// let _perf = production_mes::perf::PerfGuard::new("project_gantt");
/// ```
pub struct PerfGuard {
    op: &'static str,
    started: Instant,
    baseline: SqlStats,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        update_stats(|s| s.open_guards = s.open_guards.saturating_add(1));
        Self {
            op,
            started: Instant::now(),
            baseline: current_stats(),
        }
    }

    /// 自 Guard 创建以来本线程执行的语句数
    pub fn statements(&self) -> u64 {
        current_stats()
            .statements
            .saturating_sub(self.baseline.statements)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let now = current_stats();
        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            sql_count = now.statements.saturating_sub(self.baseline.statements),
            slow_sql_count = now.slow_statements.saturating_sub(self.baseline.slow_statements),
            "读模型计算完成"
        );
        update_stats(|s| s.open_guards = s.open_guards.saturating_sub(1));
    }
}
