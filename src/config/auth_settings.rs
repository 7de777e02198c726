// ==========================================
// 生产执行系统 - 认证参数
// ==========================================
// 进程启动时读取一次，核心引擎不依赖
// ==========================================

use serde::Serialize;
use std::env;

pub const ENV_SECRET_KEY: &str = "PRODUCTION_MES_SECRET_KEY";
pub const ENV_TOKEN_EXPIRE_MINUTES: &str = "PRODUCTION_MES_TOKEN_EXPIRE_MINUTES";

pub const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 1440;
pub const DEFAULT_ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, Serialize)]
pub struct AuthSettings {
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub algorithm: String,
    pub token_expire_minutes: i64,
}

impl AuthSettings {
    pub fn from_env() -> Self {
        let secret_key = env::var(ENV_SECRET_KEY).unwrap_or_default();
        if secret_key.is_empty() {
            tracing::warn!("{} 未设置，签名密钥为空", ENV_SECRET_KEY);
        }

        let token_expire_minutes = env::var(ENV_TOKEN_EXPIRE_MINUTES)
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TOKEN_EXPIRE_MINUTES);

        Self {
            secret_key,
            algorithm: DEFAULT_ALGORITHM.to_string(),
            token_expire_minutes,
        }
    }
}
