// ==========================================
// ProductionApi 集成测试
// ==========================================
// 测试范围:
// 1. 派工: 责任人校验、状态推进
// 2. 完工: 整单扣料、物料不足拒绝、全有或全无
// 3. 返工: 不良品拆分、订单延期、重开后再次扣料
// 4. 幂等: 终态任务重复完工不再扣料
// ==========================================

mod helpers;

use helpers::api_test_helper::*;

use production_mes::api::ApiError;
use production_mes::domain::{ActionType, OrderStatus, PrincipalRole, TaskStatus};

// ==========================================
// 派工
// ==========================================

#[test]
fn test_assign_推进订单与任务状态() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let product_id = env.seed_product("P-ASSIGN", &[("切割", 10, &[]), ("焊接", 20, &[])]);
    let order = env.create_order(product_id, 3);
    assert_eq!(order.order.status, OrderStatus::New);

    let task = env
        .production_api
        .assign_responsible(order.tasks[0].id, operator.id, TEST_ACTOR)
        .expect("派工失败");

    assert_eq!(task.status, TaskStatus::Working);
    assert_eq!(task.responsible_principal_id, Some(operator.id));
    assert!(task.start_time_actual.is_some());

    let reloaded = env.order_api.get_order(order.order.id).expect("查询失败");
    assert_eq!(reloaded.order.status, OrderStatus::InProgress);
    assert_eq!(reloaded.tasks[1].status, TaskStatus::Pending);

    let history = env.production_api.task_history(task.id).expect("查询失败");
    assert!(history
        .iter()
        .any(|l| l.action_type == ActionType::AssignTask.as_str()));
}

#[test]
fn test_assign_非操作工被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let dispatcher = env.seed_principal("dispatcher_a", PrincipalRole::Dispatcher);
    let product_id = env.seed_product("P-ROLE", &[("切割", 10, &[])]);
    let order = env.create_order(product_id, 1);

    let result = env
        .production_api
        .assign_responsible(order.tasks[0].id, dispatcher.id, TEST_ACTOR);
    assert!(matches!(result, Err(ApiError::InvalidAssignee(_))));

    let tasks = env.order_api.list_tasks(Some(order.order.id)).expect("查询失败");
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert_eq!(tasks[0].responsible_principal_id, None);
}

#[test]
fn test_assign_停用人员被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    env.catalog_api
        .deactivate_principal(operator.id, TEST_ACTOR)
        .expect("停用失败");
    let product_id = env.seed_product("P-INACTIVE", &[("切割", 10, &[])]);
    let order = env.create_order(product_id, 1);

    let result = env
        .production_api
        .assign_responsible(order.tasks[0].id, operator.id, TEST_ACTOR);
    assert!(matches!(result, Err(ApiError::InvalidAssignee(_))));
}

#[test]
fn test_assign_任务不存在() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();

    let result = env.production_api.assign_responsible(9999, operator.id, TEST_ACTOR);
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

// ==========================================
// 完工扣料
// ==========================================

#[test]
fn test_complete_按整单数量扣料() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let steel = env.seed_material("钢板", "kg", 100.0);
    let product_id = env.seed_product("P-DEDUCT", &[("切割", 10, &[(steel, 2.0)])]);
    let order = env.create_order(product_id, 10);
    let task_id = order.tasks[0].id;

    env.production_api
        .assign_responsible(task_id, operator.id, TEST_ACTOR)
        .expect("派工失败");
    let result = env
        .production_api
        .complete_task(task_id, 0, None, TEST_ACTOR)
        .expect("完工失败");

    assert_eq!(result.status, TaskStatus::Done);
    assert_eq!(result.order_status, OrderStatus::Completed);
    assert_eq!(result.good_quantity, 10);
    assert_eq!(result.defective_quantity, 0);
    assert!(!result.already_terminal);
    assert_eq!(result.deduction_log.len(), 1);
    assert_eq!(result.deduction_log[0].material_id, steel);
    assert_eq!(result.deduction_log[0].amount, 20.0);
    assert_eq!(result.deduction_log[0].remaining, 80.0);
    assert_eq!(env.stock_of(steel), 80.0);

    let events = env.production_api.task_deductions(task_id).expect("查询失败");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].amount, 20.0);
    assert_eq!(events[0].cycle, 1);
}

#[test]
fn test_complete_物料不足拒绝且库存不变() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let wire = env.seed_material("焊丝", "kg", 5.0);
    let product_id = env.seed_product("P-SHORT", &[("焊接", 10, &[(wire, 1.0)])]);
    let order = env.create_order(product_id, 10);
    let task_id = order.tasks[0].id;
    env.production_api
        .assign_responsible(task_id, operator.id, TEST_ACTOR)
        .expect("派工失败");

    let result = env.production_api.complete_task(task_id, 0, None, TEST_ACTOR);

    match result {
        Err(ApiError::InsufficientMaterial {
            material_id,
            needed,
            available,
            ..
        }) => {
            assert_eq!(material_id, wire);
            assert_eq!(needed, 10.0);
            assert_eq!(available, 5.0);
        }
        other => panic!("应返回物料不足, 实际: {:?}", other),
    }

    assert_eq!(env.stock_of(wire), 5.0);
    let tasks = env.order_api.list_tasks(Some(order.order.id)).expect("查询失败");
    assert_eq!(tasks[0].status, TaskStatus::Working);
    assert!(env.production_api.task_deductions(task_id).expect("查询失败").is_empty());
}

#[test]
fn test_complete_多物料全有或全无() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let paint = env.seed_material("磁漆", "L", 100.0);
    let seal = env.seed_material("密封件", "套", 3.0);
    let product_id = env.seed_product("P-ATOMIC", &[("装配", 30, &[(paint, 1.0), (seal, 1.0)])]);
    let order = env.create_order(product_id, 4);
    let task_id = order.tasks[0].id;
    env.production_api
        .assign_responsible(task_id, operator.id, TEST_ACTOR)
        .expect("派工失败");

    let result = env.production_api.complete_task(task_id, 0, None, TEST_ACTOR);
    assert!(matches!(result, Err(ApiError::InsufficientMaterial { material_id, .. }) if material_id == seal));

    // 排在前面的物料也未被扣减
    assert_eq!(env.stock_of(paint), 100.0);
    assert_eq!(env.stock_of(seal), 3.0);
}

#[test]
fn test_complete_同一物料多条定额合并扣减() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let iron = env.seed_material("铸铁", "kg", 50.0);
    let product_id = env.seed_product("P-MERGE", &[("铸造", 60, &[(iron, 1.5), (iron, 2.5)])]);
    let order = env.create_order(product_id, 10);
    let task_id = order.tasks[0].id;
    env.production_api
        .assign_responsible(task_id, operator.id, TEST_ACTOR)
        .expect("派工失败");

    let result = env
        .production_api
        .complete_task(task_id, 0, None, TEST_ACTOR)
        .expect("完工失败");

    assert_eq!(result.deduction_log.len(), 1);
    assert_eq!(result.deduction_log[0].amount, 40.0);
    assert_eq!(env.stock_of(iron), 10.0);
}

#[test]
fn test_complete_未派工任务直接完工() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-DIRECT", &[("切割", 10, &[]), ("涂装", 10, &[])]);
    let order = env.create_order(product_id, 2);

    let result = env
        .production_api
        .complete_task(order.tasks[0].id, 0, None, TEST_ACTOR)
        .expect("完工失败");
    assert_eq!(result.status, TaskStatus::Done);
    assert_eq!(result.order_status, OrderStatus::InProgress);

    let tasks = env.order_api.list_tasks(Some(order.order.id)).expect("查询失败");
    assert!(tasks[0].start_time_actual.is_some());
    assert!(tasks[0].end_time_actual.is_some());
    assert!(tasks[0].start_time_actual <= tasks[0].end_time_actual);

    let history = env.production_api.task_history(order.tasks[0].id).expect("查询失败");
    let log = history
        .iter()
        .find(|l| l.action_type == ActionType::CompleteTask.as_str())
        .expect("缺少完工日志");
    assert!(log.detail.as_deref().unwrap_or("").contains("良品数=2"));
}

#[test]
fn test_complete_全部工序完成后订单完工() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-CHAIN", &[("切割", 10, &[]), ("焊接", 10, &[])]);
    let order = env.create_order(product_id, 1);

    let first = env
        .production_api
        .complete_task(order.tasks[0].id, 0, None, TEST_ACTOR)
        .expect("完工失败");
    assert_eq!(first.order_status, OrderStatus::InProgress);

    let second = env
        .production_api
        .complete_task(order.tasks[1].id, 0, None, TEST_ACTOR)
        .expect("完工失败");
    assert_eq!(second.order_status, OrderStatus::Completed);

    let reloaded = env.order_api.get_order(order.order.id).expect("查询失败");
    assert_eq!(reloaded.order.status, OrderStatus::Completed);
}

#[test]
fn test_complete_不良数量越界() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let steel = env.seed_material("钢板", "kg", 100.0);
    let product_id = env.seed_product("P-DEFECT", &[("切割", 10, &[(steel, 1.0)])]);
    let order = env.create_order(product_id, 10);
    let task_id = order.tasks[0].id;

    for bad in [-1, 11] {
        let result = env.production_api.complete_task(task_id, bad, None, TEST_ACTOR);
        assert!(
            matches!(result, Err(ApiError::InvalidDefectQuantity { .. })),
            "defective={} 应被拒绝",
            bad
        );
    }
    assert_eq!(env.stock_of(steel), 100.0);
}

#[test]
fn test_complete_工序模板缺失时不扣料() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let steel = env.seed_material("钢板", "kg", 100.0);
    let product_id = env.seed_product("P-RENAMED", &[("切割", 10, &[(steel, 1.0)])]);
    let order = env.create_order(product_id, 10);

    // 任务保存的是建单时的工序名快照
    env.raw_conn()
        .execute(
            "UPDATE stage_templates SET name = '激光切割' WHERE product_id = ?1",
            [product_id],
        )
        .expect("改名失败");

    let result = env
        .production_api
        .complete_task(order.tasks[0].id, 0, None, TEST_ACTOR)
        .expect("完工失败");

    assert!(result.stage_template_missing);
    assert!(result.deduction_log.is_empty());
    assert_eq!(result.status, TaskStatus::Done);
    assert_eq!(env.stock_of(steel), 100.0);
}

// ==========================================
// 返工
// ==========================================

#[test]
fn test_complete_不良品触发返工并延期订单() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let flange = env.seed_material("法兰", "件", 100.0);
    let product_id = env.seed_product("P-REWORK", &[("装配", 90, &[(flange, 1.0)])]);
    let order = env.create_order(product_id, 20);
    let task_id = order.tasks[0].id;
    env.production_api
        .assign_responsible(task_id, operator.id, TEST_ACTOR)
        .expect("派工失败");

    let result = env
        .production_api
        .complete_task(task_id, 3, None, TEST_ACTOR)
        .expect("完工失败");

    assert_eq!(result.status, TaskStatus::ReworkNeeded);
    assert_eq!(result.order_status, OrderStatus::Delayed);
    assert_eq!(result.good_quantity, 17);
    assert_eq!(result.defective_quantity, 3);
    // 扣料按整单数量，不按良品数
    assert_eq!(result.deduction_log[0].amount, 20.0);
    assert_eq!(env.stock_of(flange), 80.0);

    let tasks = env.order_api.list_tasks(Some(order.order.id)).expect("查询失败");
    assert_eq!(tasks[0].end_time_actual, None);

    let history = env.production_api.task_history(task_id).expect("查询失败");
    let rework = history
        .iter()
        .find(|l| l.action_type == ActionType::TaskRework.as_str())
        .expect("缺少返工日志");
    let detail = rework.detail.as_deref().unwrap_or("");
    assert!(detail.contains("工序=装配"));
    assert!(detail.contains("不良数=3"));
    assert!(detail.contains("备注=none"));
    assert!(detail.contains(&operator.display_name()));
}

#[test]
fn test_complete_返工备注与未指派占位() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-COMMENT", &[("装配", 90, &[])]);
    let order = env.create_order(product_id, 5);
    let task_id = order.tasks[0].id;

    env.production_api
        .complete_task(task_id, 1, Some("密封面泄漏"), TEST_ACTOR)
        .expect("完工失败");

    let history = env.production_api.task_history(task_id).expect("查询失败");
    let rework = history
        .iter()
        .find(|l| l.action_type == ActionType::TaskRework.as_str())
        .expect("缺少返工日志");
    let detail = rework.detail.as_deref().unwrap_or("");
    assert!(detail.contains("备注=密封面泄漏"));
    assert!(detail.contains("责任人=未指派"));
}

#[test]
fn test_complete_终态任务重复完工幂等() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let steel = env.seed_material("钢板", "kg", 100.0);
    let product_id = env.seed_product("P-IDEMP", &[("切割", 10, &[(steel, 1.0)])]);
    let order = env.create_order(product_id, 10);
    let task_id = order.tasks[0].id;

    env.production_api
        .complete_task(task_id, 0, None, TEST_ACTOR)
        .expect("完工失败");
    let again = env
        .production_api
        .complete_task(task_id, 0, None, TEST_ACTOR)
        .expect("重复完工不应报错");

    assert!(again.already_terminal);
    assert_eq!(again.status, TaskStatus::Done);
    assert!(again.deduction_log.is_empty());
    assert_eq!(env.stock_of(steel), 90.0);
    assert_eq!(env.production_api.task_deductions(task_id).expect("查询失败").len(), 1);
}

#[test]
fn test_reopen_返工重开后再次扣料() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let flange = env.seed_material("法兰", "件", 100.0);
    let product_id = env.seed_product("P-REOPEN", &[("装配", 90, &[(flange, 1.0)])]);
    let order = env.create_order(product_id, 20);
    let task_id = order.tasks[0].id;
    env.production_api
        .assign_responsible(task_id, operator.id, TEST_ACTOR)
        .expect("派工失败");
    env.production_api
        .complete_task(task_id, 3, None, TEST_ACTOR)
        .expect("完工失败");

    // 返工任务在重开之前保持终态
    let idle = env
        .production_api
        .complete_task(task_id, 0, None, TEST_ACTOR)
        .expect("终态任务完工不应报错");
    assert!(idle.already_terminal);
    assert_eq!(idle.status, TaskStatus::ReworkNeeded);
    assert_eq!(env.stock_of(flange), 80.0);

    let reopened = env.production_api.reopen_task(task_id, TEST_ACTOR).expect("重开失败");
    assert_eq!(reopened.status, TaskStatus::Working);
    assert_eq!(reopened.cycle, 2);

    let result = env
        .production_api
        .complete_task(task_id, 0, None, TEST_ACTOR)
        .expect("完工失败");
    assert_eq!(result.status, TaskStatus::Done);
    assert_eq!(result.order_status, OrderStatus::Completed);
    assert_eq!(env.stock_of(flange), 60.0);

    let events = env.production_api.task_deductions(task_id).expect("查询失败");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].cycle, 1);
    assert_eq!(events[1].cycle, 2);
}

#[test]
fn test_reopen_非返工任务被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-NOREOPEN", &[("切割", 10, &[])]);
    let order = env.create_order(product_id, 1);

    let result = env.production_api.reopen_task(order.tasks[0].id, TEST_ACTOR);
    assert!(matches!(result, Err(ApiError::InvalidStateTransition { .. })));
}

// ==========================================
// 库存守恒
// ==========================================

#[test]
fn test_库存守恒_初始减扣减事件等于结存() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let iron = env.seed_material("铸铁", "kg", 1000.0);
    let paint = env.seed_material("磁漆", "L", 50.0);
    let product_id = env.seed_product(
        "P-CONSERVE",
        &[("铸造", 60, &[(iron, 12.5)]), ("涂装", 30, &[(paint, 0.5), (iron, 0.25)])],
    );

    for qty in [4, 8, 2] {
        let order = env.create_order(product_id, qty);
        for task in &order.tasks {
            env.production_api
                .complete_task(task.id, 0, None, TEST_ACTOR)
                .expect("完工失败");
        }
    }

    let recorded: f64 = env
        .order_api
        .list_tasks(None)
        .expect("查询失败")
        .iter()
        .flat_map(|t| env.production_api.task_deductions(t.id).expect("查询失败"))
        .filter(|e| e.material_id == iron)
        .map(|e| e.amount)
        .sum();

    assert_eq!(recorded, 14.0 * 12.75);
    assert_eq!(env.stock_of(iron), 1000.0 - recorded);
    assert_eq!(env.stock_of(paint), 50.0 - 14.0 * 0.5);
}

#[test]
fn test_complete_浮点定额恰好等于结存() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let sealant = env.seed_material("密封胶", "kg", 0.3);
    let product_id = env.seed_product("P-EXACT", &[("密封", 15, &[(sealant, 0.1)])]);
    let order = env.create_order(product_id, 3);

    let availability = env.analytics_api.check_availability().expect("查询失败");
    assert!(availability.items[0].sufficient);
    assert_eq!(availability.items[0].deficit, 0.0);

    let result = env
        .production_api
        .complete_task(order.tasks[0].id, 0, None, TEST_ACTOR)
        .expect("完工失败");

    assert_eq!(result.status, TaskStatus::Done);
    assert_eq!(result.deduction_log.len(), 1);
    assert_eq!(result.deduction_log[0].remaining, 0.0);
    assert_eq!(env.stock_of(sealant), 0.0);
}

// ==========================================
// 边界角色校验
// ==========================================

#[test]
fn test_security_按角色放行报工与建单() {
    use production_mes::security::{require_role, ORDER_WRITERS, TASK_COMPLETERS};

    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    let dispatcher = env.seed_principal("dispatcher_a", PrincipalRole::Dispatcher);

    assert!(require_role(&operator, TASK_COMPLETERS).is_ok());
    assert!(matches!(
        require_role(&operator, ORDER_WRITERS),
        Err(ApiError::Forbidden(_))
    ));
    assert!(require_role(&dispatcher, ORDER_WRITERS).is_ok());

    env.catalog_api
        .deactivate_principal(operator.id, TEST_ACTOR)
        .expect("停用失败");
    let reloaded = env
        .catalog_api
        .find_principal_by_username("operator_a")
        .expect("查询失败");
    assert!(matches!(
        require_role(&reloaded, TASK_COMPLETERS),
        Err(ApiError::Forbidden(_))
    ));
}
