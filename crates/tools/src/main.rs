mod balance;
mod context;
mod migrate;
mod plan;
mod trace;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{crate_version, Arg, ArgMatches, Command};

use crate::context::{read_config, MigrationContext};

const COMMAND_BALANCE: &str = "balance";
const COMMAND_PLAN: &str = "plan";
const COMMAND_MIGRATE: &str = "migrate";
const ARG_CONFIG: &str = "config";
const ARG_CELL_LIMIT: &str = "cell-limit";
const ARG_OUTPUT_PATH: &str = "output-path";

fn cell_limit(m: &ArgMatches) -> Result<Option<usize>> {
    m.value_of(ARG_CELL_LIMIT)
        .map(|s| s.parse::<usize>().with_context(|| format!("invalid cell limit {}", s)))
        .transpose()
}

fn load_context(m: &ArgMatches) -> Result<MigrationContext> {
    let config_path = m.value_of(ARG_CONFIG).unwrap_or("./config.toml");
    let config = read_config(config_path)?;
    MigrationContext::from_config(config)
}

async fn run_cli() -> Result<()> {
    let arg_config = Arg::new(ARG_CONFIG)
        .short('c')
        .takes_value(true)
        .required(true)
        .default_value("./config.toml")
        .help("The config file path");
    let arg_cell_limit = Arg::new(ARG_CELL_LIMIT)
        .long(ARG_CELL_LIMIT)
        .takes_value(true)
        .help("Max inputs of a tx, overrides the config");

    let app = Command::new("lock-migrator")
        .about("Move every live cell of a lock script to another lock")
        .version(crate_version!())
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_BALANCE)
                .about("Show the capacity of plain cells owned by the wallet")
                .arg(arg_config.clone())
                .display_order(0),
        )
        .subcommand(
            Command::new(COMMAND_PLAN)
                .about("Build the migration txs without sending them")
                .arg(arg_config.clone())
                .arg(arg_cell_limit.clone())
                .arg(
                    Arg::new(ARG_OUTPUT_PATH)
                        .short('o')
                        .takes_value(true)
                        .help("Write the planned txs as json"),
                )
                .display_order(1),
        )
        .subcommand(
            Command::new(COMMAND_MIGRATE)
                .about("Build, sign and send the migration txs")
                .arg(arg_config)
                .arg(arg_cell_limit)
                .display_order(2),
        );

    let matches = app.get_matches();
    match matches.subcommand() {
        Some((COMMAND_BALANCE, m)) => {
            let ctx = load_context(m)?;
            balance::get_balance(&ctx).await?;
        }
        Some((COMMAND_PLAN, m)) => {
            let ctx = load_context(m)?;
            let output = m.value_of(ARG_OUTPUT_PATH).map(Path::new);
            plan::plan(&ctx, cell_limit(m)?, output).await?;
        }
        Some((COMMAND_MIGRATE, m)) => {
            let ctx = load_context(m)?;
            migrate::migrate(&ctx, cell_limit(m)?).await?;
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = trace::init() {
        eprintln!("init tracing: {}", err);
    }
    if let Err(err) = run_cli().await {
        log::error!("{:#}", err);
        std::process::exit(-1);
    }
}
