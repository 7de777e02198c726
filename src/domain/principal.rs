// ==========================================
// 生产执行系统 - 人员领域模型
// ==========================================
// 认证与口令不在本系统范围内，这里只保留身份与角色
// ==========================================

use crate::domain::types::PrincipalRole;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub role: PrincipalRole,
    pub is_active: bool,
}

impl Principal {
    /// 展示名：姓 名 父称，缺省时回退为登录名
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [
            self.last_name.as_str(),
            self.first_name.as_str(),
            self.patronymic.as_deref().unwrap_or(""),
        ]
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect();

        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// 新建人员参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrincipal {
    pub username: String,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub role: PrincipalRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut p = Principal {
            id: 1,
            username: "operator_ivanov".to_string(),
            last_name: String::new(),
            first_name: String::new(),
            patronymic: None,
            role: PrincipalRole::Operator,
            is_active: true,
        };
        assert_eq!(p.display_name(), "operator_ivanov");

        p.last_name = "Ivanov".to_string();
        p.first_name = "Petr".to_string();
        assert_eq!(p.display_name(), "Ivanov Petr");
    }
}
