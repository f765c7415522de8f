use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use std::time::Duration;
use invoice_import::{
    api, create_pool, AppConfig, InvoiceImporter, InvoiceService, PgImportStore, ProductService,
};
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置 (默认值 -> config/app -> 环境变量)
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let product_service = Arc::new(ProductService::new(pool.clone()));
    let invoice_service = Arc::new(InvoiceService::new(pool.clone()));
    let importer = Arc::new(InvoiceImporter::new(
        PgImportStore::new(pool),
        Duration::from_secs(config.import.timeout_secs),
    ));

    // 商品路由
    let product_routes = Router::new()
        .route("/api/products", get(api::list_products))
        .route("/api/product", post(api::create_product))
        .route(
            "/api/product/:id",
            get(api::get_product).put(api::update_product).delete(api::delete_product),
        )
        .with_state(product_service);

    // 发票路由
    let invoice_routes = Router::new()
        .route("/api/invoices", get(api::list_invoices))
        .route("/api/invoice", post(api::create_invoice))
        .route(
            "/api/invoice/:id",
            get(api::get_invoice).put(api::update_invoice).delete(api::delete_invoice),
        )
        .with_state(invoice_service);

    // 批量导入路由
    let import_routes = Router::new()
        .route("/api/invoices/import", post(api::import_invoices))
        .route("/api/invoices/import/csv", post(api::import_invoices_csv))
        .with_state(importer);

    // 合并路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(product_routes)
        .merge(invoice_routes)
        .merge(import_routes)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET/POST/PUT/DELETE /api/product[/:id], GET /api/products");
    info!("  GET/POST/PUT/DELETE /api/invoice[/:id], GET /api/invoices");
    info!("  POST /api/invoices/import      - JSON rows");
    info!("  POST /api/invoices/import/csv  - CSV sheets");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
