// ==========================================
// 生产执行系统 - 演示库初始化
// ==========================================
// 用法: seed_demo_db [数据库路径]
// 已存在的库先备份再删除；数据全部经由 API 写入，库存与审计保持一致
// ==========================================

use chrono::{Duration, Local, Utc};
use std::error::Error;
use std::fs;
use std::path::Path;

use production_mes::api::CreateOrderRequest;
use production_mes::app::{get_default_db_path, AppState};
use production_mes::domain::{
    MaterialRequirement, NewMaterial, NewPrincipal, NewProduct, NewStageTemplate, PrincipalRole,
};

const SEED_ACTOR: &str = "seed";

/// 工序定义: (名称, 单件工时, [(物料下标, 单件定额)])
type StageDef = (&'static str, i64, &'static [(usize, f64)]);

fn main() -> Result<(), Box<dyn Error>> {
    production_mes::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;

    let operator_id = seed_principals(&state)?;
    let material_ids = seed_materials(&state)?;
    let product_ids = seed_products(&state, &material_ids)?;
    seed_orders(&state, &product_ids, operator_id)?;

    print_quick_counts(&state)?;
    eprintln!("演示库已就绪: {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

/// 返回负责报工的操作工 id
fn seed_principals(state: &AppState) -> Result<i64, Box<dyn Error>> {
    let users = [
        ("chief_engineer", "王", "建国", PrincipalRole::Dispatcher),
        ("dispatch_junior", "李", "明", PrincipalRole::Dispatcher),
        ("tech_sun", "孙", "立", PrincipalRole::Technologist),
        ("tech_zhou", "周", "宁", PrincipalRole::Technologist),
        ("foreman_zhang", "张", "强", PrincipalRole::Operator),
        ("operator_liu", "刘", "洋", PrincipalRole::Operator),
        ("operator_chen", "陈", "杰", PrincipalRole::Operator),
        ("operator_yang", "杨", "帆", PrincipalRole::Operator),
        ("operator_zhao", "赵", "磊", PrincipalRole::Operator),
        ("qc_huang", "黄", "丽", PrincipalRole::Operator),
    ];

    let mut foreman_id = None;
    for (username, last_name, first_name, role) in users {
        let principal = state.catalog_api.create_principal(
            NewPrincipal {
                username: username.to_string(),
                last_name: last_name.to_string(),
                first_name: first_name.to_string(),
                patronymic: None,
                role,
            },
            SEED_ACTOR,
        )?;
        if username == "foreman_zhang" {
            foreman_id = Some(principal.id);
        }
    }
    eprintln!("人员: {} 名", users.len());

    foreman_id.ok_or_else(|| "缺少操作工 foreman_zhang".into())
}

fn seed_materials(state: &AppState) -> Result<Vec<i64>, Box<dyn Error>> {
    let materials = [
        ("灰铸铁 HT200", "kg", 8000.0),
        ("圆钢 Ø40", "m", 500.0),
        ("钢板 5mm", "m²", 300.0),
        ("电机 10kW", "台", 80.0),
        ("工业蓝色磁漆", "L", 200.0),
        ("密封件套装", "套", 500.0),
        ("法兰 DN100", "件", 200.0),
        ("轴承 30212", "件", 400.0),
        ("焊丝", "kg", 100.0),
        ("过滤网", "m²", 150.0),
    ];

    let mut ids = Vec::with_capacity(materials.len());
    for (name, unit, stock) in materials {
        let material = state.catalog_api.create_material(
            NewMaterial {
                name: name.to_string(),
                unit: unit.to_string(),
                quantity_in_stock: stock,
            },
            SEED_ACTOR,
        )?;
        ids.push(material.id);
    }
    eprintln!("物料: {} 种", ids.len());
    Ok(ids)
}

fn seed_products(state: &AppState, material_ids: &[i64]) -> Result<Vec<i64>, Box<dyn Error>> {
    const IRON: usize = 0;
    const ROD: usize = 1;
    const SHEET: usize = 2;
    const MOTOR: usize = 3;
    const PAINT: usize = 4;
    const SEAL: usize = 5;
    const FLANGE: usize = 6;
    const BEARING: usize = 7;
    const WIRE: usize = 8;
    const MESH: usize = 9;

    let catalog: [(&str, &str, &str, &[StageDef]); 6] = [
        (
            "离心泵 NC-10",
            "PUMP-NC10",
            "工业水泵",
            &[
                ("壳体铸造", 300, &[(IRON, 50.0)]),
                ("机加工", 180, &[]),
                ("装配与测试", 120, &[(MOTOR, 1.0), (SEAL, 1.0)]),
                ("涂装", 60, &[(PAINT, 0.8)]),
            ],
        ),
        (
            "减速器壳体 RK-05",
            "HOUSING-RK05",
            "铸造壳体",
            &[("毛坯铸造", 240, &[(IRON, 30.0)]), ("机加工", 150, &[(BEARING, 2.0)])],
        ),
        (
            "楔式闸阀 DZ-100",
            "VALVE-DZ100",
            "截止阀门",
            &[
                ("壳体铸造", 180, &[(IRON, 20.0)]),
                ("机加工", 120, &[]),
                ("装配与测试", 90, &[(FLANGE, 2.0)]),
            ],
        ),
        ("长泵轴 VN-12", "SHAFT-VN12", "高精度轴", &[("机加工", 480, &[(ROD, 8.0)])]),
        (
            "过滤元件 EF-03",
            "FILTER-EF03",
            "焊接组件",
            &[
                ("板材切割", 60, &[(MESH, 1.2)]),
                ("滤网焊接", 120, &[(WIRE, 0.5)]),
                ("涂装", 30, &[(PAINT, 0.1)]),
            ],
        ),
        (
            "通用底座框架",
            "FRAME-UBASE",
            "焊接框架",
            &[
                ("板材切割", 90, &[(SHEET, 5.0)]),
                ("焊接", 180, &[(WIRE, 1.0)]),
                ("涂装", 90, &[(PAINT, 1.5)]),
            ],
        ),
    ];

    let mut product_ids = Vec::with_capacity(catalog.len());
    for (name, code, description, stages) in catalog {
        let product = state.catalog_api.create_product(
            NewProduct {
                name: name.to_string(),
                code: code.to_string(),
                description: Some(description.to_string()),
            },
            SEED_ACTOR,
        )?;

        for (idx, (stage_name, norm, reqs)) in stages.iter().enumerate() {
            let requirements = reqs
                .iter()
                .map(|(mat_idx, qty)| MaterialRequirement {
                    material_id: material_ids[*mat_idx],
                    quantity_needed: *qty,
                })
                .collect();
            state.catalog_api.create_stage(
                NewStageTemplate {
                    product_id: product.id,
                    name: stage_name.to_string(),
                    order_in_chain: idx as i64 + 1,
                    norm_time_minutes: *norm,
                    requirements,
                },
                SEED_ACTOR,
            )?;
        }
        product_ids.push(product.id);
    }
    eprintln!("产品与工艺卡: {} 个", product_ids.len());
    Ok(product_ids)
}

/// 订单场景: (产品下标, 数量, 客户, 开工天数前, 已完成工序数, 下一道是否返工)
fn seed_orders(
    state: &AppState,
    product_ids: &[i64],
    operator_id: i64,
) -> Result<(), Box<dyn Error>> {
    let scenarios: [(usize, i64, &str, i64, usize, bool); 8] = [
        (0, 15, "石化机械集团", 10, usize::MAX, false),
        (2, 100, "燃气能源公司", 5, 2, false),
        (1, 20, "项目投资公司", 1, 1, false),
        (3, 50, "国防科技", 7, 0, false),
        (5, 5, "建工机械", 2, usize::MAX, false),
        (4, 50, "水务建设", 0, 0, false),
        (0, 3, "第二修理厂", 0, 0, false),
        (2, 10, "特种起重", 3, 2, true),
    ];

    let now = Utc::now().naive_utc();
    for (product_idx, quantity, client, days_ago, done_count, rework_next) in scenarios {
        let created = state.order_api.create_order(
            CreateOrderRequest {
                client_name: client.to_string(),
                product_id: product_ids[product_idx],
                quantity,
                deadline_date: now + Duration::days(7),
                start_date: Some(now - Duration::days(days_ago)),
            },
            SEED_ACTOR,
        )?;

        for (idx, task) in created.tasks.iter().enumerate() {
            if idx < done_count {
                state
                    .production_api
                    .assign_responsible(task.id, operator_id, SEED_ACTOR)?;
                state
                    .production_api
                    .complete_task(task.id, 0, None, SEED_ACTOR)?;
            } else if idx == done_count && days_ago > 0 {
                state
                    .production_api
                    .assign_responsible(task.id, operator_id, SEED_ACTOR)?;
                if rework_next {
                    state.production_api.complete_task(
                        task.id,
                        2,
                        Some("密封面泄漏"),
                        SEED_ACTOR,
                    )?;
                }
                break;
            } else {
                break;
            }
        }
    }
    eprintln!("订单: {} 个", scenarios.len());
    Ok(())
}

fn print_quick_counts(state: &AppState) -> Result<(), Box<dyn Error>> {
    let orders = state.order_api.list_orders()?;
    let tasks = state.order_api.list_tasks(None)?;
    let shortages = state.analytics_api.check_availability()?.shortages().count();

    eprintln!("--------------------------------------------------");
    for order in &orders {
        eprintln!("订单 #{} {} x{} [{}]", order.id, order.client_name, order.quantity, order.status);
    }
    eprintln!("任务总数: {}, 缺料物料数: {}", tasks.len(), shortages);
    Ok(())
}
