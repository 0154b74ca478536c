use invoice_ledger::config::{Backend, Config};
use invoice_ledger::extract::FormRecognizerClient;
use invoice_ledger::http::{self, AppState};
use invoice_ledger::store::mysql::MysqlStore;
use invoice_ledger::store::sqlite::SqliteStore;
use invoice_ledger::store::InvoiceStore;
use std::fs;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "invoice_ledger.toml".to_string());
    let cfg = Config::load(&config_path)?;

    fs::create_dir_all(&cfg.server.upload_dir)?;
    fs::create_dir_all(&cfg.server.export_dir)?;

    let store: Arc<dyn InvoiceStore> = match cfg.database.backend {
        Backend::Sqlite => Arc::new(SqliteStore::open(&cfg.database.sqlite_path)?),
        Backend::Mysql => {
            let url = cfg
                .database
                .mysql_url
                .as_deref()
                .ok_or("database.mysql_url is required for the mysql backend")?;
            Arc::new(MysqlStore::connect(url).await?)
        }
    };

    let extractor = Arc::new(FormRecognizerClient::new(&cfg.extractor)?);

    let state = AppState {
        store,
        extractor,
        upload_dir: cfg.server.upload_dir.clone(),
        export_dir: cfg.server.export_dir.clone(),
        max_upload_bytes: cfg.server.max_upload_bytes,
    };

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr).await?;
    info!(addr = %cfg.server.bind_addr, backend = ?cfg.database.backend, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
