// ==========================================
// 生产执行系统 - 行映射辅助
// ==========================================
// 时间戳统一按 db::TIMESTAMP_FORMAT 存取
// 枚举列解析失败转换为 FromSqlConversionFailure，不做默认值兜底
// ==========================================

use crate::db::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use std::str::FromStr;

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_opt_ts(ts: &Option<NaiveDateTime>) -> Option<String> {
    ts.as_ref().map(format_ts)
}

/// 解析时间戳列
pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 解析可空时间戳列
pub fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDateTime>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

/// 解析枚举列
pub fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
