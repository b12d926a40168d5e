use fcoe_fabric::{FabricConfig, PortError, switch::PortType};
use log::{error, info, warn};
use tokio::{task::JoinSet, time::interval};

use std::time::Duration;

const DEFAULT_INTERFACE: &str = "ens1";
const LOGIN_REPORT_INTERVAL: Duration = Duration::from_secs(30);

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() -> Result<(), PortError> {
    use fcoe_fabric::toolkits::af_packet::{new_switch, register_port};

    env_logger::init();

    let mut ifnames: Vec<String> = std::env::args().skip(1).collect();
    if ifnames.is_empty() {
        ifnames.push(DEFAULT_INTERFACE.to_string());
    }

    let switch = new_switch(FabricConfig::default());
    info!(
        "Fabric {} / {}, FC-MAP {}",
        switch.config().wwnn,
        switch.config().wwpn,
        switch.config().fc_map
    );

    let mut dispatchers = JoinSet::new();
    for ifname in ifnames.iter() {
        let hdl = register_port(&switch, ifname, PortType::F)?;
        let ifname = ifname.clone();
        dispatchers.spawn(async move { (ifname, hdl.await) });
    }

    let mut ticker = interval(LOGIN_REPORT_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for login in switch.logins() {
                    info!("{} {} {}", login.fcid, login.wwpn, login.wwnn);
                }
            }
            done = dispatchers.join_next() => {
                match done {
                    Some(Ok((ifname, Ok(end)))) => warn!("{ifname}: {end}"),
                    Some(Ok((ifname, Err(e)))) => error!("{ifname}: dispatch panicked: {e}"),
                    Some(Err(e)) => error!("join error: {e}"),
                    None => break,
                }
            }
        }
    }

    warn!("All ports are down");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("fcoe-switch needs AF_PACKET sockets, which are Linux only");
}
