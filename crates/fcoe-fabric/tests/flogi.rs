use fcoe_fabric::{
    DispatchEnd, FabricConfig, FcMap, FcidPool, PortError,
    fc_wire::{
        ElsCommand, FCOE_ETHERTYPE, FcAddress, FcType, ServiceParameters, Wwn,
        els::{ElsFrame, LsRjt},
        fc::{FCtl, RCtl},
    },
    switch::PortType,
    toolkits::mem::{new_port, new_switch},
};

mod common;
use common::*;

const MTU: usize = 9000;
const FIRST: FcAddress = FcAddress::new(0xEF, 0x01, 0x00);

#[tokio::test]
async fn flogi_accepted() {
    init_logs();
    let switch = new_switch(FabricConfig::default());
    let (port, mut wire) = new_port("mem0", MTU, switch.config()).unwrap();
    port.start().unwrap();
    switch.add_port(port.clone(), PortType::F);

    let req = flogi(HOST_WWPN, 0x4321);
    wire.inject(FCOE_ETHERTYPE, raw_fcoe(HOST_MAC, &req));

    let sent = wire.next_sent().await.unwrap();
    let (eth, fcoe, rep) = decode_sent(&sent.bytes);
    assert_eq!(eth.destination, HOST_MAC);
    assert_eq!(eth.source, FcMap::DEFAULT.mac_for(FcAddress::FABRIC_LOGIN));
    assert_eq!(fcoe.crc32, fcoe.checksum());

    assert_eq!(rep.sof, req.sof);
    assert_eq!(rep.eof, req.eof);
    assert_eq!(rep.r_ctl, RCtl(0x22));
    assert_eq!(rep.fc_type, FcType::ELS);
    assert_eq!(rep.cs_ctl, 0);
    assert_eq!(rep.source, FcAddress::FABRIC_LOGIN);
    assert_eq!(rep.destination, FIRST);
    assert_eq!(rep.f_ctl, FCtl::LAST_RESPONSE);
    assert_eq!(rep.seq_id, req.seq_id);
    assert_eq!(rep.ox_id, 0x4321);
    assert_eq!(rep.rx_id, 0x0001);

    let els = ElsFrame::from_bytes(&rep.payload).unwrap();
    assert_eq!(els.command, ElsCommand::ACC);
    let params = ServiceParameters::from_bytes(&els.payload).unwrap();
    assert_eq!(params.wwpn, switch.config().wwpn);
    assert_eq!(params.wwnn, switch.config().wwnn);

    assert_eq!(port.peer(), Some(FcMap::DEFAULT.mac_for(FIRST)));
    let logins = switch.logins();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].fcid, FIRST);
    assert_eq!(logins[0].wwpn, HOST_WWPN);
    assert_eq!(logins[0].wwnn, HOST_WWNN);
}

#[tokio::test]
async fn unknown_requests_are_skipped() {
    init_logs();
    let switch = new_switch(FabricConfig::default());
    let (port, mut wire) = new_port("mem0", MTU, switch.config()).unwrap();
    port.start().unwrap();
    switch.add_port(port, PortType::F);

    // SCR and an FCP frame get no answer
    let scr = els_request(FcAddress::UNASSIGNED, 1, vec![0x62, 0, 0, 0, 0, 0, 0, 3]);
    let mut fcp = els_request(FcAddress::UNASSIGNED, 2, vec![0u8; 32]);
    fcp.fc_type = FcType::FCP;
    wire.inject(FCOE_ETHERTYPE, raw_fcoe(HOST_MAC, &scr));
    wire.inject(FCOE_ETHERTYPE, raw_fcoe(HOST_MAC, &fcp));
    wire.inject(FCOE_ETHERTYPE, raw_fcoe(HOST_MAC, &flogi(HOST_WWPN, 3)));

    let (_, _, rep) = decode_sent(&wire.next_sent().await.unwrap().bytes);
    assert_eq!(rep.ox_id, 3);
    assert_eq!(rep.destination, FIRST);
    assert!(wire.try_next_sent().is_none());
}

#[tokio::test]
async fn relogin_keeps_address() {
    init_logs();
    let switch = new_switch(FabricConfig::default());
    let (port, mut wire) = new_port("mem0", MTU, switch.config()).unwrap();
    port.start().unwrap();
    switch.add_port(port, PortType::F);

    wire.inject(FCOE_ETHERTYPE, raw_fcoe(HOST_MAC, &flogi(HOST_WWPN, 1)));
    let first = wire.next_sent().await.unwrap();
    let (_, _, first) = decode_sent(&first.bytes);

    // after the ACC the host talks from its FPMA
    let fpma = FcMap::DEFAULT.mac_for(FIRST);
    wire.inject(FCOE_ETHERTYPE, raw_fcoe(fpma, &flogi(HOST_WWPN, 2)));
    let second = wire.next_sent().await.unwrap();
    assert_eq!(second.dst, fpma);
    let (_, _, second) = decode_sent(&second.bytes);

    assert_eq!(second.destination, first.destination);
    assert_eq!(second.ox_id, 2);
    assert_eq!(second.payload, first.payload);
    assert_eq!(switch.logins().len(), 1);
}

#[tokio::test]
async fn distinct_flogis_same_shape() {
    init_logs();
    let switch = new_switch(FabricConfig::default());
    let (port, mut wire) = new_port("mem0", MTU, switch.config()).unwrap();
    port.start().unwrap();
    switch.add_port(port, PortType::F);

    wire.inject(FCOE_ETHERTYPE, raw_fcoe(HOST_MAC, &flogi(HOST_WWPN, 0x10)));
    let (_, _, first) = decode_sent(&wire.next_sent().await.unwrap().bytes);

    let other = Wwn(0x1000_000d_ec30_9891);
    let fpma = FcMap::DEFAULT.mac_for(first.destination);
    wire.inject(FCOE_ETHERTYPE, raw_fcoe(fpma, &flogi(other, 0x20)));
    let (_, _, second) = decode_sent(&wire.next_sent().await.unwrap().bytes);

    assert_eq!(first.ox_id, 0x10);
    assert_eq!(second.ox_id, 0x20);
    assert_eq!(first.rx_id, second.rx_id);
    assert_eq!(first.f_ctl, second.f_ctl);
    assert_eq!(first.r_ctl, second.r_ctl);
    assert_eq!(first.fc_type, second.fc_type);

    // the new port name replaced the old login on this link
    let logins = switch.logins();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].wwpn, other);
    assert_eq!(logins[0].fcid, FIRST);
}

#[tokio::test]
async fn exhausted_pool_rejects() {
    init_logs();
    let config = FabricConfig {
        fcid_pool: FcidPool::new(FIRST, FIRST),
        ..Default::default()
    };
    let switch = new_switch(config);
    let (port_a, mut wire_a) = new_port("mem0", MTU, switch.config()).unwrap();
    let (port_b, mut wire_b) = new_port("mem1", MTU, switch.config()).unwrap();
    port_a.start().unwrap();
    port_b.start().unwrap();
    let hdl_a = switch.add_port(port_a.clone(), PortType::F);
    switch.add_port(port_b.clone(), PortType::F);

    wire_a.inject(FCOE_ETHERTYPE, raw_fcoe(HOST_MAC, &flogi(HOST_WWPN, 1)));
    let (_, _, acc) = decode_sent(&wire_a.next_sent().await.unwrap().bytes);
    assert_eq!(acc.destination, FIRST);

    let other = Wwn(0x1000_000d_ec30_9890);
    wire_b.inject(FCOE_ETHERTYPE, raw_fcoe(OTHER_MAC, &flogi(other, 1)));
    let sent = wire_b.next_sent().await.unwrap();
    assert_eq!(sent.dst, OTHER_MAC);
    let (_, _, rjt) = decode_sent(&sent.bytes);
    assert_eq!(rjt.destination, FcAddress::UNASSIGNED);
    let els = ElsFrame::from_bytes(&rjt.payload).unwrap();
    assert_eq!(els.command, ElsCommand::LS_RJT);
    assert_eq!(
        LsRjt::from_els(&els),
        Ok(LsRjt {
            reason: 0x09,
            explanation: 0x29,
        })
    );
    // no address, no retarget
    assert_eq!(port_b.peer(), Some(OTHER_MAC));

    // port A goes away and takes its login with it
    port_a.close();
    assert_eq!(
        hdl_a.await.unwrap(),
        DispatchEnd::PortFailed(PortError::Closed)
    );
    assert!(switch.logins().is_empty());

    wire_b.inject(FCOE_ETHERTYPE, raw_fcoe(OTHER_MAC, &flogi(other, 2)));
    let (_, _, acc) = decode_sent(&wire_b.next_sent().await.unwrap().bytes);
    assert_eq!(acc.destination, FIRST);
    assert_eq!(switch.login(other).map(|l| l.fcid), Some(FIRST));
}

#[tokio::test]
async fn port_failure_ends_dispatch() {
    init_logs();
    let switch = new_switch(FabricConfig::default());
    let (port, wire) = new_port("mem0", MTU, switch.config()).unwrap();
    port.start().unwrap();
    let hdl = switch.add_port(port, PortType::E);
    assert_eq!(
        switch.ports(),
        vec![("FCoE/mem0".to_string(), PortType::E)]
    );

    wire.inject_error(FCOE_ETHERTYPE, std::io::ErrorKind::NetworkDown);
    assert!(matches!(
        hdl.await.unwrap(),
        DispatchEnd::PortFailed(PortError::Failed(_))
    ));
}
