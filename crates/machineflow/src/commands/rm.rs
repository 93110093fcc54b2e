use super::load_driver;
use colored::Colorize;
use machineflow_driver::{Driver, MachineStore};

pub async fn handle(store: &MachineStore, name: &str, force: bool) -> anyhow::Result<()> {
    let mut driver = load_driver(store, name).await?;

    println!("{}", format!("マシン '{}' を削除中...", name).yellow());

    if let Err(e) = driver.remove().await {
        if !force {
            return Err(e.into());
        }
        println!(
            "{}",
            format!("⚠ リモートリソースの削除に失敗しました: {}", e).yellow()
        );
    }

    store.remove(name).await?;

    println!();
    println!(
        "{}",
        format!("✓ マシン '{}' を削除しました", name).green().bold()
    );
    Ok(())
}
