pub mod create;
pub mod flags;
pub mod inspect;
pub mod ls;
pub mod power;
pub mod rm;

use machineflow_driver::{Driver, MachineStore};
use machineflow_driver_ovh::{DRIVER_NAME, OvhDriver};

/// Load a stored machine and rebuild its driver
pub(crate) async fn load_driver(store: &MachineStore, name: &str) -> anyhow::Result<OvhDriver> {
    let record = store.load(name).await?;
    if record.driver_name != DRIVER_NAME {
        anyhow::bail!(
            "マシン '{}' のドライバー '{}' はサポートされていません",
            name,
            record.driver_name
        );
    }
    Ok(record.driver::<OvhDriver>()?)
}

/// Persist the driver record of a machine
pub(crate) async fn save_driver(store: &MachineStore, driver: &OvhDriver) -> anyhow::Result<()> {
    store
        .save(&driver.base.machine_name, driver.driver_name(), driver)
        .await?;
    Ok(())
}
