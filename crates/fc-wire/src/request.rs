//! Classification of inbound FC frames
//!
//! A frame is inspected once, here, and the result handed to the fabric as a
//! [`Request`]. Anything the fabric does not serve ends up in one of the
//! catch-all variants with just enough information to log it.

use crate::{
    DecodeError,
    els::{ElsCommand, ElsFrame, Flogi},
    fc::{FcFrame, FcType},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Els(ElsRequest),
    Unknown { fc_type: FcType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElsRequest {
    Flogi(Flogi),
    Other { command: ElsCommand },
}

impl Request {
    /// Decode the payload of `frame` according to its TYPE
    ///
    /// Fails if the frame is an ELS whose command word, or whose FLOGI body,
    /// cannot be decoded.
    pub fn classify(frame: &FcFrame) -> Result<Self, DecodeError> {
        if frame.fc_type != FcType::ELS {
            return Ok(Request::Unknown {
                fc_type: frame.fc_type,
            });
        }

        let els = ElsFrame::from_bytes(&frame.payload)?;
        let req = match els.command {
            ElsCommand::FLOGI => ElsRequest::Flogi(Flogi::from_bytes(&els.payload)?),
            command => ElsRequest::Other { command },
        };
        Ok(Request::Els(req))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        els::Wwn,
        fc::{Eof, FCtl, FcAddress, RCtl, Sof},
    };

    fn frame(fc_type: FcType, payload: alloc::vec::Vec<u8>) -> FcFrame {
        FcFrame {
            sof: Sof::I3,
            eof: Eof::T,
            r_ctl: RCtl::ELS_UNSOLICITED_CONTROL,
            fc_type,
            cs_ctl: 0,
            source: FcAddress::UNASSIGNED,
            destination: FcAddress::FABRIC_LOGIN,
            f_ctl: FCtl(0x29_0000),
            seq_id: 0,
            df_ctl: 0,
            seq_cnt: 0,
            ox_id: 0x0042,
            rx_id: FcFrame::UNKNOWN_XID,
            parameter: 0,
            payload,
        }
    }

    #[test]
    fn flogi() {
        let flogi = Flogi {
            wwpn: Wwn(0x1000_000d_ec30_9880),
            wwnn: Wwn(0x2000_000d_ec30_9881),
            ..Default::default()
        };
        let fr = frame(FcType::ELS, flogi.to_els(ElsCommand::FLOGI).to_bytes());
        assert_eq!(
            Request::classify(&fr),
            Ok(Request::Els(ElsRequest::Flogi(flogi)))
        );
    }

    #[test]
    fn other_els_and_types() {
        let fr = frame(FcType::ELS, vec![0x62, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(
            Request::classify(&fr),
            Ok(Request::Els(ElsRequest::Other {
                command: ElsCommand::SCR
            }))
        );

        let fr = frame(FcType::FCP, vec![0; 32]);
        assert_eq!(
            Request::classify(&fr),
            Ok(Request::Unknown {
                fc_type: FcType::FCP
            })
        );
    }

    #[test]
    fn broken_els() {
        assert!(Request::classify(&frame(FcType::ELS, vec![0x04])).is_err());
        assert!(Request::classify(&frame(FcType::ELS, vec![0x04, 0, 0, 0, 1, 2])).is_err());
    }
}
