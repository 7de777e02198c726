// ==========================================
// OrderApi / CatalogApi 集成测试
// ==========================================
// 测试范围:
// 1. 建单: 按工艺卡生成任务、参数校验、原子性
// 2. 主数据: 工艺卡排序、唯一约束、人员停用
// ==========================================

mod helpers;

use chrono::Duration;
use helpers::api_test_helper::*;

use production_mes::api::{ApiError, CreateOrderRequest};
use production_mes::domain::{ActionType, NewMaterial, NewStageTemplate, OrderStatus, TaskStatus};

fn request(product_id: i64, quantity: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        client_name: "石化机械".to_string(),
        product_id,
        quantity,
        deadline_date: base_time() + Duration::days(3),
        start_date: Some(base_time()),
    }
}

// ==========================================
// 建单
// ==========================================

#[test]
fn test_create_order_按工艺卡顺序生成任务() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product(
        "P-ORDER",
        &[("铸造", 300, &[]), ("机加工", 180, &[]), ("涂装", 60, &[])],
    );

    let created = env
        .order_api
        .create_order(request(product_id, 15), TEST_ACTOR)
        .expect("建单失败");

    assert_eq!(created.order.status, OrderStatus::New);
    assert_eq!(created.order.quantity, 15);
    let names: Vec<&str> = created.tasks.iter().map(|t| t.stage_name.as_str()).collect();
    assert_eq!(names, vec!["铸造", "机加工", "涂装"]);
    assert!(created
        .tasks
        .iter()
        .all(|t| t.status == TaskStatus::Pending && t.cycle == 1 && t.responsible_principal_id.is_none()));

    let actions = env.production_api.recent_actions(10).expect("查询失败");
    assert!(actions.iter().any(|l| l.action_type == ActionType::CreateOrder.as_str()
        && l.order_id == Some(created.order.id)));
}

#[test]
fn test_create_order_工艺卡乱序录入仍按位置排序() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-UNORDERED", &[]);
    for (name, pos) in [("涂装", 3), ("铸造", 1), ("机加工", 2)] {
        env.catalog_api
            .create_stage(
                NewStageTemplate {
                    product_id,
                    name: name.to_string(),
                    order_in_chain: pos,
                    norm_time_minutes: 10,
                    requirements: Vec::new(),
                },
                TEST_ACTOR,
            )
            .expect("创建工序失败");
    }

    let created = env
        .order_api
        .create_order(request(product_id, 1), TEST_ACTOR)
        .expect("建单失败");
    let names: Vec<&str> = created.tasks.iter().map(|t| t.stage_name.as_str()).collect();
    assert_eq!(names, vec!["铸造", "机加工", "涂装"]);
}

#[test]
fn test_create_order_产品不存在时不留痕() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let result = env.order_api.create_order(request(777, 5), TEST_ACTOR);

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert!(env.order_api.list_orders().expect("查询失败").is_empty());
    assert!(env.order_api.list_tasks(None).expect("查询失败").is_empty());
}

#[test]
fn test_create_order_参数校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-VALIDATE", &[("切割", 10, &[])]);

    let zero = env.order_api.create_order(request(product_id, 0), TEST_ACTOR);
    assert!(matches!(zero, Err(ApiError::InvalidInput(_))));

    let mut blank = request(product_id, 1);
    blank.client_name = "   ".to_string();
    assert!(matches!(
        env.order_api.create_order(blank, TEST_ACTOR),
        Err(ApiError::InvalidInput(_))
    ));

    let mut late = request(product_id, 1);
    late.deadline_date = base_time() - Duration::days(1);
    assert!(matches!(
        env.order_api.create_order(late, TEST_ACTOR),
        Err(ApiError::InvalidInput(_))
    ));

    assert!(env.order_api.list_orders().expect("查询失败").is_empty());
}

#[test]
fn test_get_order_不存在() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    assert!(matches!(env.order_api.get_order(1), Err(ApiError::NotFound(_))));
}

// ==========================================
// 主数据
// ==========================================

#[test]
fn test_create_stage_同产品重名被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-DUP", &[("切割", 10, &[])]);

    let result = env.catalog_api.create_stage(
        NewStageTemplate {
            product_id,
            name: "切割".to_string(),
            order_in_chain: 2,
            norm_time_minutes: 10,
            requirements: Vec::new(),
        },
        TEST_ACTOR,
    );

    assert!(result.is_err());
    assert_eq!(env.catalog_api.resolve_chain(product_id).expect("查询失败").len(), 1);
}

#[test]
fn test_create_stage_定额引用不存在的物料() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let product_id = env.seed_product("P-NOMAT", &[]);

    let result = env.catalog_api.create_stage(
        NewStageTemplate {
            product_id,
            name: "切割".to_string(),
            order_in_chain: 1,
            norm_time_minutes: 10,
            requirements: vec![production_mes::domain::MaterialRequirement {
                material_id: 42,
                quantity_needed: 1.0,
            }],
        },
        TEST_ACTOR,
    );

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
fn test_create_material_负库存被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let result = env.catalog_api.create_material(
        NewMaterial {
            name: "钢板".to_string(),
            unit: "kg".to_string(),
            quantity_in_stock: -1.0,
        },
        TEST_ACTOR,
    );

    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    assert!(env.catalog_api.list_materials().expect("查询失败").is_empty());
}

#[test]
fn test_principal_停用与查询() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let operator = env.seed_operator();
    assert!(operator.is_active);

    env.catalog_api
        .deactivate_principal(operator.id, TEST_ACTOR)
        .expect("停用失败");

    let found = env
        .catalog_api
        .find_principal_by_username("operator_a")
        .expect("查询失败");
    assert!(!found.is_active);

    assert!(matches!(
        env.catalog_api.deactivate_principal(999, TEST_ACTOR),
        Err(ApiError::NotFound(_))
    ));
}
