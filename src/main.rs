// ==========================================
// 生产执行系统 - 命令行入口
// ==========================================
// 用法: production-mes [summary|gantt|availability|report|actions] [数据库路径]
// 结果以 JSON 输出到 stdout，日志输出到 stderr
// ==========================================

use anyhow::{bail, Context, Result};

use production_mes::app::{get_default_db_path, AppState};
use production_mes::logging;

fn main() -> Result<()> {
    logging::init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "summary".to_string());
    let db_path = std::env::args().nth(2).unwrap_or_else(get_default_db_path);

    tracing::info!("==================================================");
    tracing::info!("{} v{}", production_mes::APP_NAME, production_mes::VERSION);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("==================================================");

    let state = AppState::new(db_path)
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let output = match command.as_str() {
        "summary" => serde_json::to_string_pretty(&serde_json::json!({
            "availability": state.analytics_api.check_availability()?,
            "gantt": state.analytics_api.project_gantt(None)?,
        }))?,
        "gantt" => serde_json::to_string_pretty(&state.analytics_api.project_gantt(None)?)?,
        "availability" => serde_json::to_string_pretty(&state.analytics_api.check_availability()?)?,
        "report" => serde_json::to_string_pretty(&state.analytics_api.materials_report(None)?)?,
        "actions" => serde_json::to_string_pretty(&state.production_api.recent_actions(50)?)?,
        other => bail!("未知命令: {} (可选: summary, gantt, availability, report, actions)", other),
    };

    println!("{}", output);
    Ok(())
}
