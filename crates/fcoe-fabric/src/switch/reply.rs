//! Replies to fabric login

use fc_wire::{
    ElsCommand, FcAddress, FcFrame, FcType, ServiceParameters,
    els::LsRjt,
    fc::{FCtl, RCtl},
};

use crate::config::FabricConfig;

/// The header of a reply to `request`, with an empty payload
///
/// Delimiters, SEQ_ID and OX_ID are carried over, the addresses swapped.
pub fn new_reply(request: &FcFrame, config: &FabricConfig) -> FcFrame {
    FcFrame {
        sof: request.sof,
        eof: request.eof,
        r_ctl: RCtl::ELS_UNSOLICITED_CONTROL,
        fc_type: FcType::ELS,
        cs_ctl: 0,
        source: request.destination,
        destination: request.source,
        f_ctl: FCtl::LAST_RESPONSE,
        seq_id: request.seq_id,
        df_ctl: 0,
        seq_cnt: 0,
        ox_id: request.ox_id,
        rx_id: config.reply_rx_id,
        parameter: 0,
        payload: Vec::new(),
    }
}

/// Accept a FLOGI, assigning `fcid` to the N_Port
pub fn flogi_acc(request: &FcFrame, config: &FabricConfig, fcid: FcAddress) -> FcFrame {
    let params = ServiceParameters::fabric(config.wwpn, config.wwnn, config.r_a_tov, config.e_d_tov);
    FcFrame {
        destination: fcid,
        payload: params.to_els(ElsCommand::ACC).to_bytes(),
        ..new_reply(request, config)
    }
}

/// Reject a request
pub fn ls_rjt(request: &FcFrame, config: &FabricConfig, reason: LsRjt) -> FcFrame {
    FcFrame {
        payload: reason.to_els().to_bytes(),
        ..new_reply(request, config)
    }
}
