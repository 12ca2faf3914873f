use ra4draw::cli::commands::{CliArgs, Commands};
use ra4draw::cli::handlers::{
    handle_batch, handle_compile, handle_limit_ratio, handle_remove_backups, handle_submit,
    handle_sync_variables, handle_sys_table, handle_texify,
};
use ra4draw::util::logging::{init_logging, parse_level, LoggingConfig};
use ra4draw::{Ra4DrawConfig, VERSION};

use clap::Parser;
use std::env;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("ra4draw v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let config = Ra4DrawConfig::default();
    if let Err(err) = config.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    let exit_code = match &args.command {
        Commands::Compile(compile_args) => handle_compile(compile_args, &config),
        Commands::Batch(batch_args) => handle_batch(batch_args, &config),
        Commands::LimitRatio(plot_args) => handle_limit_ratio(plot_args),
        Commands::Texify(texify_args) => handle_texify(texify_args, &config),
        Commands::SysTable(table_args) => handle_sys_table(table_args, &config),
        Commands::Submit(submit_args) => handle_submit(submit_args, &config),
        Commands::RemoveBackups(backup_args) => handle_remove_backups(backup_args),
        Commands::SyncVariables(sync_args) => handle_sync_variables(sync_args, &config),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("RA4DRAW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("RA4DRAW_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
