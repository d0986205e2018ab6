use credkeeper::{cli::run_cli, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let result = run_cli().await;
    if let Err(e) = &result {
        tracing::error!(app_name = APP_NAME, version = VERSION, error = %e, "credkeeper failed");
    }
    result
}
