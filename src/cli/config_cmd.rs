use crate::config::{Config, ElicitationMode, TrayConfig};
use crate::error::Result;

/// Show the effective configuration, or change the shared elicitation mode.
pub async fn run_config(config: &Config, elicitation_mode: Option<ElicitationMode>) -> Result<()> {
    if let Some(mode) = elicitation_mode {
        let tray = TrayConfig {
            elicitation_mode: mode,
        };
        tray.save(config)?;
        eprintln!("traybridge: elicitation mode set to {mode:?}");
        return Ok(());
    }

    let tray = TrayConfig::load(config);
    println!("State root: {}", config.root.display());
    println!("Projects root: {}", config.projects_root.display());
    println!("Monitored process: {}", config.monitored_process);
    println!("Responder tick: {:?}", config.responder_tick);
    println!("Producer poll: {:?}", config.producer_poll);
    println!("Request timeout: {:?}", config.request_timeout);
    println!("Stale threshold: {:?}", config.stale_threshold);
    println!("Elicitation mode: {:?}", tray.elicitation_mode);
    Ok(())
}
