use super::load_driver;
use machineflow_driver::{Driver, MachineStore};

pub async fn status(store: &MachineStore, name: &str) -> anyhow::Result<()> {
    let mut driver = load_driver(store, name).await?;
    let state = driver.get_state().await?;
    println!("{}", state);
    Ok(())
}

pub async fn url(store: &MachineStore, name: &str) -> anyhow::Result<()> {
    let driver = load_driver(store, name).await?;
    println!("{}", driver.get_url()?);
    Ok(())
}

pub async fn ip(store: &MachineStore, name: &str) -> anyhow::Result<()> {
    let driver = load_driver(store, name).await?;
    let ip = driver.get_ssh_hostname()?;
    if ip.is_empty() {
        anyhow::bail!("マシン '{}' にはIPアドレスがありません", name);
    }
    println!("{}", ip);
    Ok(())
}

pub async fn ssh_key_path(store: &MachineStore, name: &str) -> anyhow::Result<()> {
    let driver = load_driver(store, name).await?;
    println!("{}", driver.get_ssh_key_path().display());
    Ok(())
}

