#![allow(dead_code)]

use fcoe_fabric::fc_wire::{
    ElsCommand, Eof, EthernetFrame, FCOE_ETHERTYPE, FcAddress, FcFrame, FcType, FcoeFrame, Flogi,
    MacAddr, Sof, Wwn,
    fc::{FCtl, RCtl},
};

/// Burned-in MAC of the test initiator
pub const HOST_MAC: MacAddr = MacAddr([0x00, 0x0d, 0xec, 0x30, 0x98, 0x80]);
pub const OTHER_MAC: MacAddr = MacAddr([0x00, 0x0d, 0xec, 0x30, 0x98, 0x90]);
pub const FCF_MAC: MacAddr = MacAddr([0x00, 0x1b, 0x21, 0x00, 0x00, 0x01]);

pub const HOST_WWPN: Wwn = Wwn(0x1000_000d_ec30_9880);
pub const HOST_WWNN: Wwn = Wwn(0x2000_000d_ec30_9881);

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An Ethernet frame as it comes off the wire, without padding
pub fn raw_eth(src: MacAddr, ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(14 + payload.len());
    out.extend_from_slice(&FCF_MAC.0);
    out.extend_from_slice(&src.0);
    out.extend_from_slice(&ethertype.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn raw_fcoe(src: MacAddr, frame: &FcFrame) -> Vec<u8> {
    raw_eth(src, FCOE_ETHERTYPE, &FcoeFrame::encapsulate(frame).to_bytes())
}

pub fn els_request(source: FcAddress, ox_id: u16, payload: Vec<u8>) -> FcFrame {
    FcFrame {
        sof: Sof::I3,
        eof: Eof::T,
        r_ctl: RCtl::ELS_UNSOLICITED_CONTROL,
        fc_type: FcType::ELS,
        cs_ctl: 0,
        source,
        destination: FcAddress::FABRIC_LOGIN,
        f_ctl: FCtl(0x29_0000),
        seq_id: 0x01,
        df_ctl: 0,
        seq_cnt: 0,
        ox_id,
        rx_id: FcFrame::UNKNOWN_XID,
        parameter: 0,
        payload,
    }
}

pub fn flogi(wwpn: Wwn, ox_id: u16) -> FcFrame {
    let params = Flogi {
        wwpn,
        wwnn: HOST_WWNN,
        ..Default::default()
    };
    els_request(
        FcAddress::UNASSIGNED,
        ox_id,
        params.to_els(ElsCommand::FLOGI).to_bytes(),
    )
}

/// Unwrap a transmitted frame down to FC
pub fn decode_sent(bytes: &[u8]) -> (EthernetFrame, FcoeFrame, FcFrame) {
    let eth = EthernetFrame::from_bytes(bytes).unwrap();
    let fcoe = FcoeFrame::from_bytes(&eth.payload).unwrap();
    let fc = fcoe.fc_frame().unwrap();
    (eth, fcoe, fc)
}
