use anyhow::Result;
use clap::Parser;
use dotboy_cli::{args::Args, config, session};

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let cfg = config::load_from_file(&config_path);
    let opts = args.options(cfg);

    session::run(&opts)?;
    Ok(())
}
