#![allow(dead_code)]

use std::fs;
use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGING: OnceCell<()> = OnceCell::new();

#[ctor::ctor]
fn init_logging() {
    LOGGING.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

/// Write `config/<name>.json` under `base`.
pub fn write_config(base: &Path, name: &str, body: serde_json::Value) {
    let dir = base.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{name}.json")), body.to_string()).unwrap();
}

/// Create empty module files under `base/app/`.
pub fn touch_modules(base: &Path, files: &[&str]) {
    for rel in files {
        let path = base.join("app").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
}
