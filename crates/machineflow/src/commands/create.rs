use super::save_driver;
use colored::Colorize;
use machineflow_driver::{Driver, DriverOptions, FlagValue, MachineStore};
use machineflow_driver_ovh::{OvhDriver, create_flags};

pub async fn handle(
    store: &MachineStore,
    name: &str,
    explicit: Vec<(&'static str, FlagValue)>,
) -> anyhow::Result<()> {
    if store.exists(name) {
        anyhow::bail!("マシン '{}' は既に存在します", name);
    }

    println!("{}", format!("マシン '{}' を作成中...", name).yellow());

    let options = DriverOptions::with_defaults(&create_flags(), explicit);
    let mut driver = OvhDriver::new(name, store.root());
    driver.set_config_from_flags(&options)?;

    println!("{}", "設定を検証中...".dimmed());
    driver.pre_create_check().await?;

    // 作成途中で失敗しても rm できるように先に保存
    save_driver(store, &driver).await?;

    println!("{}", "インスタンスを作成中 (数分かかることがあります)...".dimmed());
    let created = driver.create().await;
    save_driver(store, &driver).await?;
    created?;

    println!();
    println!(
        "{}",
        format!("✓ マシン '{}' を作成しました", name).green().bold()
    );
    println!("  IP:  {}", driver.base().ip_address.cyan());
    println!("  URL: {}", driver.get_url()?.cyan());
    println!(
        "  SSH: ssh -i {} {}@{}",
        driver.get_ssh_key_path().display(),
        driver.base().ssh_user,
        driver.get_ssh_hostname()?
    );

    Ok(())
}
