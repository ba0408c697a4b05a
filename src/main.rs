/// Hot-reload host executable
/// Loads the application module named in the config file given as the first
/// argument (else `$HOTLOAD_CONFIG`, else `hotload.toml`) and runs it,
/// reloading code and assets as they change on disk.

use std::process::ExitCode;
use hotload::config::{config_path, CONFIG_ENV_VAR};
use hotload::{host, AppResult, Dispatcher, DylibLoader, Host, HostConfig, Supervisor};

fn run() -> anyhow::Result<AppResult> {
    let args: Vec<String> = std::env::args().collect();
    let config = HostConfig::load(config_path(&args, std::env::var(CONFIG_ENV_VAR).ok()))?;

    log::info!(
        "Watching module {} and assets {} every {:?}",
        config.hot_reload.module_path.display(),
        config.hot_reload.asset_root.display(),
        config.hot_reload.poll_interval()
    );

    let frame_interval = config.frame_interval();
    let supervisor = Supervisor::new(config.hot_reload, DylibLoader::new());
    let mut host = Host::new(Dispatcher::new(supervisor), host::stdin_events(), frame_interval);

    Ok(host.run(&args))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(AppResult::Success) => ExitCode::SUCCESS,
        Ok(result) => {
            log::error!("Application finished with {:?}", result);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Host failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
