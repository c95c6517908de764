//! SheetMacro API Server binary
//!
//! HTTP REST API for evaluating sheets.

use clap::Parser;
use sheetmacro::api::{run_api_server, server::ApiConfig};
use sheetmacro::config::EngineConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sheetmacro-server")]
#[command(version)]
#[command(author = "RoyalBit Inc. <admin@royalbit.ca>")]
#[command(about = "SheetMacro API Server - HTTP REST API for spreadsheet macro evaluation")]
#[command(long_about = r#"
SheetMacro API Server - HTTP REST API

Endpoints:
  - GET  /api/v1/functions - List registered functions
  - POST /api/v1/evaluate  - Evaluate posted rows (row 0 is the header)
  - POST /api/v1/calculate - Evaluate a CSV file or YAML store on the server

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

Passes on the same sheet id are serialized; different sheets run concurrently.

Example usage:
  sheetmacro-server                           # Start on localhost:8080
  sheetmacro-server --host 0.0.0.0 --port 3000 --config functions.yaml

  curl -X POST http://localhost:8080/api/v1/evaluate \
    -H "Content-Type: application/json" \
    -d '{"sheet_id": "demo", "rows": [["Func1"], ["?"]]}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SHEETMACRO_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SHEETMACRO_PORT")]
    port: u16,

    /// Engine configuration file (YAML)
    #[arg(short, long, env = "SHEETMACRO_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let engine = EngineConfig::load_optional(args.config.as_deref())?;
    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config, engine).await
}
