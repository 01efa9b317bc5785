mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use db_bootstrap::{bootstrap, AppRegistry, ModuleCatalog};
use tracing::{error, info};

use crate::telemetry::{init_tracing, LogFormat};

#[derive(Parser)]
#[command(name = "dbcheck")]
#[command(about = "Resolve datasource config and check every database is reachable")]
struct Args {
    /// Application base directory (holds `config/` and `app/`)
    #[arg(short, long, env = "DB_BOOTSTRAP_BASE", default_value = ".")]
    base: PathBuf,

    /// Runtime environment key inside the config file
    #[arg(short, long, env = "APP_ENV", default_value = "local")]
    env: String,

    /// Config file stem and top-level key
    #[arg(long, default_value = "sequelize")]
    config_name: String,

    /// Build connections only, skip the connectivity check
    #[arg(long)]
    no_wait: bool,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    init_tracing(args.log_format);

    let mut app = AppRegistry::new(&args.base, &args.env);
    let boot = match bootstrap()
        .with_config_name(&args.config_name)
        .with_catalog(ModuleCatalog::new())
        .configure(&mut app)
    {
        Ok(boot) => boot,
        Err(e) => {
            error!("dbcheck=failed stage=configure err={e}");
            eprintln!("Bootstrap failed: {e}");
            return ExitCode::from(1);
        }
    };

    for conn in boot.connections() {
        println!("{}\t{}", conn.delegate(), conn.sanitized_url());
    }
    if boot.connections().is_empty() {
        eprintln!(
            "No datasources configured for env '{}' under {}",
            args.env,
            args.base.display()
        );
    }

    if args.no_wait {
        return ExitCode::SUCCESS;
    }

    let states = boot.auth_states();
    let outcomes = boot.into_auth().outcomes().await;
    let mut failed = false;
    for outcome in outcomes {
        match outcome {
            Ok(report) => println!(
                "{}\tok\tattempts={}",
                report.delegate, report.attempts
            ),
            Err(e) => {
                failed = true;
                eprintln!("{e}");
            }
        }
    }

    for (delegate, state) in states.snapshot() {
        info!(delegate = %delegate, state = ?state, "dbcheck=state");
    }

    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
