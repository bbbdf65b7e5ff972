use clap::Parser;
use color_eyre::Result;
use finsight::{AppConfig, CacheManager, ConfigManager, RunOptions, APP_NAME};
use finsight_cli::Args;

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.clear_cache {
        match CacheManager::new(APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing cache: {}", e);
                    std::process::exit(1);
                }
                println!("Cache cleared successfully");
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No cache to clear");
                return Ok(Some(()));
            }
        }
    }

    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(config) => match config.write_default_config(args.force) {
                Ok(path) => {
                    println!("Wrote default configuration to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let mut config = AppConfig::load(APP_NAME)?;
    config.apply_args(&args);
    config.validate()?;

    let log_path = finsight::init_logging(&config)?;
    tracing::info!(
        log = %log_path.display(),
        locale = %config.initial_locale(),
        offline = config.service.offline,
        "starting {}",
        APP_NAME
    );

    let options = RunOptions::from(&args);
    if let Err(e) = finsight::run(options, config) {
        tracing::error!("exiting with error: {e}");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    tracing::info!("exited cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_to_run_options() {
        let args = Args::parse_from(["finsight", "--upload", "q3.xlsx", "--debug"]);
        let opts = RunOptions::from(&args);
        assert_eq!(opts.upload, Some(PathBuf::from("q3.xlsx")));
        assert!(opts.debug);
    }
}
