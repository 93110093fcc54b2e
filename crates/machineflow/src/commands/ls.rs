use super::load_driver;
use colored::Colorize;
use machineflow_driver::{Driver, MachineStore};

pub async fn handle(store: &MachineStore) -> anyhow::Result<()> {
    let names = store.list().await?;
    if names.is_empty() {
        println!("{}", "ℹ マシンはありません".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<24} {:<8} {:<12} {}", "NAME", "DRIVER", "STATE", "URL").bold()
    );

    for name in names {
        let mut driver = match load_driver(store, &name).await {
            Ok(driver) => driver,
            Err(e) => {
                println!("{:<24} {}", name, format!("{:#}", e).red());
                continue;
            }
        };

        let state = match driver.get_state().await {
            Ok(state) => format!("{:<12}", state.to_string()).green(),
            Err(e) => {
                tracing::debug!("Could not get state of {}: {}", name, e);
                format!("{:<12}", "Error").red()
            }
        };
        let url = driver.get_url().unwrap_or_default();

        println!(
            "{:<24} {:<8} {} {}",
            name,
            driver.driver_name(),
            state,
            url.cyan()
        );
    }
    Ok(())
}
