// ==========================================
// 生产执行系统 - 边界角色校验
// ==========================================
// 核心引擎不做鉴权；调用方（HTTP/GUI 层）在进入 API 前按角色放行
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::principal::Principal;
use crate::domain::types::PrincipalRole;

/// 建单
pub const ORDER_WRITERS: &[PrincipalRole] = &[PrincipalRole::Dispatcher];
/// 主数据维护
pub const CATALOG_WRITERS: &[PrincipalRole] =
    &[PrincipalRole::Dispatcher, PrincipalRole::Technologist];
/// 派工
pub const TASK_ASSIGNERS: &[PrincipalRole] = &[PrincipalRole::Dispatcher];
/// 报工 / 返工重开
pub const TASK_COMPLETERS: &[PrincipalRole] = &[PrincipalRole::Operator, PrincipalRole::Dispatcher];

pub fn allowed(role: PrincipalRole, required_roles: &[PrincipalRole]) -> bool {
    required_roles.contains(&role)
}

/// 角色不在允许列表或人员已停用 → Forbidden
pub fn require_role(principal: &Principal, required_roles: &[PrincipalRole]) -> ApiResult<()> {
    if !principal.is_active {
        return Err(ApiError::Forbidden(format!("{} 已停用", principal.username)));
    }
    if !allowed(principal.role, required_roles) {
        return Err(ApiError::Forbidden(format!(
            "{}({}) 无权执行该操作",
            principal.username, principal.role
        )));
    }
    Ok(())
}
