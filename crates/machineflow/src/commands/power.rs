use super::load_driver;
use colored::Colorize;
use machineflow_driver::{Driver, MachineStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Restart,
    Start,
    Stop,
    Kill,
}

pub async fn handle(store: &MachineStore, name: &str, action: Action) -> anyhow::Result<()> {
    let mut driver = load_driver(store, name).await?;

    let (progress, done) = match action {
        Action::Restart => ("再起動中", "再起動しました"),
        Action::Start => ("起動中", "起動しました"),
        Action::Stop => ("停止中", "停止しました"),
        Action::Kill => ("強制停止中", "強制停止しました"),
    };
    println!("{}", format!("マシン '{}' を{}...", name, progress).yellow());

    match action {
        Action::Restart => driver.restart().await?,
        Action::Start => driver.start().await?,
        Action::Stop => driver.stop().await?,
        Action::Kill => driver.kill().await?,
    }

    println!(
        "{}",
        format!("✓ マシン '{}' を{}", name, done).green().bold()
    );
    Ok(())
}
