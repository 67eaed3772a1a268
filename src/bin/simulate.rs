use anyhow::Result;
use motion_safety_core::behaviors::SafetyEvent;
use motion_safety_core::{MotionSafetyCore, SafetyConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Usage: simulate [config.toml] [report.json]
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            info!("Loading configuration from {}", path);
            SafetyConfig::from_file(&path).await?
        }
        None => {
            info!("No configuration given, using defaults");
            SafetyConfig::default()
        }
    };
    let report_path = args.next();

    let core = MotionSafetyCore::new(config)?;
    let report = core.run()?;

    info!("Simulated {} steps", report.snapshots.len());
    for event in &report.events {
        match event {
            SafetyEvent::Stop { step, position } => info!("Stop at step {} holding {}", step, position),
            SafetyEvent::Replan {
                step,
                position,
                stagnant_steps,
                time_to_interaction,
            } => warn!(
                "Replan requested at step {} from {} (stagnant {}, tti {:.2})",
                step, position, stagnant_steps, time_to_interaction
            ),
        }
    }
    let conflict_steps = report
        .snapshots
        .iter()
        .filter(|snap| !snap.lookahead_conflicts.is_empty())
        .count();
    info!("{} steps had predicted conflicts", conflict_steps);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&path, json).await?;
        info!("Report written to {}", path);
    }

    Ok(())
}
