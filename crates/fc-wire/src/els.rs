//! Extended Link Services (FC-LS)
//!
//! An ELS payload starts with a command word: the command code in the first
//! byte, three reserved bytes. What follows depends on the command.

use alloc::vec::Vec;
use core::fmt;

use crate::DecodeError;

/// The ELS command code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElsCommand(pub u8);

impl ElsCommand {
    pub const LS_RJT: Self = Self(0x01);
    pub const ACC: Self = Self(0x02);
    pub const PLOGI: Self = Self(0x03);
    pub const FLOGI: Self = Self(0x04);
    pub const LOGO: Self = Self(0x05);
    pub const RLS: Self = Self(0x0F);
    pub const ECHO: Self = Self(0x10);
    pub const PRLI: Self = Self(0x20);
    pub const PRLO: Self = Self(0x21);
    pub const FDISC: Self = Self(0x51);
    pub const RSCN: Self = Self(0x61);
    pub const SCR: Self = Self(0x62);
}

impl fmt::Display for ElsCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::LS_RJT => "LS_RJT",
            Self::ACC => "ACC",
            Self::PLOGI => "PLOGI",
            Self::FLOGI => "FLOGI",
            Self::LOGO => "LOGO",
            Self::RLS => "RLS",
            Self::ECHO => "ECHO",
            Self::PRLI => "PRLI",
            Self::PRLO => "PRLO",
            Self::FDISC => "FDISC",
            Self::RSCN => "RSCN",
            Self::SCR => "SCR",
            Self(other) => return write!(f, "0x{other:02x}"),
        };
        f.write_str(name)
    }
}

/// An ELS frame: the command code and everything after the command word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElsFrame {
    pub command: ElsCommand,
    pub payload: Vec<u8>,
}

impl ElsFrame {
    pub const COMMAND_WORD_SIZE: usize = 4;

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        DecodeError::check_len("ELS frame", Self::COMMAND_WORD_SIZE, data)?;
        Ok(Self {
            command: ElsCommand(data[0]),
            payload: data[Self::COMMAND_WORD_SIZE..].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::COMMAND_WORD_SIZE + self.payload.len());
        out.extend_from_slice(&[self.command.0, 0, 0, 0]);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// A 64-bit World Wide Name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Wwn(pub u64);

impl Wwn {
    pub const fn from_bytes(b: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(b))
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Wwn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.to_bytes().iter().enumerate() {
            if i != 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Common service parameters, the first 16 bytes of a login payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommonServiceParameters {
    pub fc_ph_high: u8,
    pub fc_ph_low: u8,
    pub bb_credit: u16,
    pub features: u16,
    /// Lower 12 bits of the word carrying the BB_SC_N
    pub rx_data_field_size: u16,
    /// Concurrent sequences and relative offset by category in a request,
    /// R_A_TOV in an F_Port's ACC
    pub word2: u32,
    pub e_d_tov: u32,
}

impl CommonServiceParameters {
    pub const FEATURE_CONTINUOUSLY_INCREASING_OFFSET: u16 = 0x8000;
    /// Set by an F_Port, clear for an N_Port
    pub const FEATURE_F_PORT: u16 = 0x1000;

    const SIZE: usize = 16;

    fn read(b: &[u8]) -> Self {
        Self {
            fc_ph_high: b[0],
            fc_ph_low: b[1],
            bb_credit: u16::from_be_bytes([b[2], b[3]]),
            features: u16::from_be_bytes([b[4], b[5]]),
            rx_data_field_size: u16::from_be_bytes([b[6], b[7]]) & 0x0FFF,
            word2: u32::from_be_bytes([b[8], b[9], b[10], b[11]]),
            e_d_tov: u32::from_be_bytes([b[12], b[13], b[14], b[15]]),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(self.fc_ph_high);
        out.push(self.fc_ph_low);
        out.extend_from_slice(&self.bb_credit.to_be_bytes());
        out.extend_from_slice(&self.features.to_be_bytes());
        out.extend_from_slice(&(self.rx_data_field_size & 0x0FFF).to_be_bytes());
        out.extend_from_slice(&self.word2.to_be_bytes());
        out.extend_from_slice(&self.e_d_tov.to_be_bytes());
    }
}

/// Per class of service parameters (16 bytes each, classes 1 through 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassParameters {
    pub service_options: u16,
    pub initiator_control: u16,
    pub recipient_control: u16,
    pub rx_data_field_size: u16,
    pub concurrent_sequences: u16,
    pub ee_credit: u16,
    pub open_sequences: u16,
}

impl ClassParameters {
    pub const OPTION_VALID: u16 = 0x8000;
    pub const OPTION_SEQUENTIAL_DELIVERY: u16 = 0x0800;

    const SIZE: usize = 16;

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.service_options & Self::OPTION_VALID != 0
    }

    fn read(b: &[u8]) -> Self {
        let be16 = |at: usize| u16::from_be_bytes([b[at], b[at + 1]]);
        Self {
            service_options: be16(0),
            initiator_control: be16(2),
            recipient_control: be16(4),
            rx_data_field_size: be16(6),
            concurrent_sequences: be16(8),
            ee_credit: be16(10),
            open_sequences: be16(12),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        for v in [
            self.service_options,
            self.initiator_control,
            self.recipient_control,
            self.rx_data_field_size,
            self.concurrent_sequences,
            self.ee_credit,
            self.open_sequences,
            0,
        ] {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }
}

/// Login service parameters, as carried by FLOGI, FDISC, PLOGI and their ACC
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceParameters {
    pub common: CommonServiceParameters,
    pub wwpn: Wwn,
    pub wwnn: Wwn,
    /// Classes 1, 2, 3 and 4, in that order
    pub classes: [ClassParameters; 4],
    pub vendor_version: [u8; 16],
}

/// A fabric login request body
pub type Flogi = ServiceParameters;

impl ServiceParameters {
    /// Size of the body following the ELS command word
    pub const SIZE: usize = 112;

    /// Receive data field size used by FCoE: a full FC frame
    pub const MAX_RX_DATA_FIELD: u16 = 2112;

    /// Parameters a fabric advertises in its FLOGI ACC
    pub fn fabric(wwpn: Wwn, wwnn: Wwn, r_a_tov: u32, e_d_tov: u32) -> Self {
        let class3 = ClassParameters {
            service_options: ClassParameters::OPTION_VALID
                | ClassParameters::OPTION_SEQUENTIAL_DELIVERY,
            ..Default::default()
        };
        Self {
            common: CommonServiceParameters {
                fc_ph_high: 0x20,
                fc_ph_low: 0x20,
                // FCoE flow control is PAUSE based, BB_Credit is ignored
                bb_credit: 0,
                features: CommonServiceParameters::FEATURE_CONTINUOUSLY_INCREASING_OFFSET
                    | CommonServiceParameters::FEATURE_F_PORT,
                rx_data_field_size: Self::MAX_RX_DATA_FIELD,
                word2: r_a_tov,
                e_d_tov,
            },
            wwpn,
            wwnn,
            classes: [
                ClassParameters::default(),
                ClassParameters::default(),
                class3,
                ClassParameters::default(),
            ],
            vendor_version: [0; 16],
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        DecodeError::check_len("login service parameters", Self::SIZE, data)?;

        let mut name = [0u8; 8];
        name.copy_from_slice(&data[16..24]);
        let wwpn = Wwn::from_bytes(name);
        name.copy_from_slice(&data[24..32]);
        let wwnn = Wwn::from_bytes(name);

        let mut classes = [ClassParameters::default(); 4];
        for (i, class) in classes.iter_mut().enumerate() {
            let at = 32 + i * ClassParameters::SIZE;
            *class = ClassParameters::read(&data[at..at + ClassParameters::SIZE]);
        }
        let mut vendor_version = [0u8; 16];
        vendor_version.copy_from_slice(&data[96..112]);

        Ok(Self {
            common: CommonServiceParameters::read(&data[..CommonServiceParameters::SIZE]),
            wwpn,
            wwnn,
            classes,
            vendor_version,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.common.write(&mut out);
        out.extend_from_slice(&self.wwpn.to_bytes());
        out.extend_from_slice(&self.wwnn.to_bytes());
        for class in self.classes.iter() {
            class.write(&mut out);
        }
        out.extend_from_slice(&self.vendor_version);
        out
    }

    /// Wrap these parameters in an ELS frame with the given command
    pub fn to_els(&self, command: ElsCommand) -> ElsFrame {
        ElsFrame {
            command,
            payload: self.to_bytes(),
        }
    }
}

/// The reason carried in an LS_RJT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LsRjt {
    pub reason: u8,
    pub explanation: u8,
}

impl LsRjt {
    pub const REASON_INVALID_COMMAND: u8 = 0x01;
    pub const REASON_LOGICAL_ERROR: u8 = 0x03;
    pub const REASON_UNABLE_TO_PERFORM: u8 = 0x09;
    pub const REASON_NOT_SUPPORTED: u8 = 0x0B;

    pub const EXPLAIN_NONE: u8 = 0x00;
    pub const EXPLAIN_INSUFFICIENT_RESOURCES: u8 = 0x29;

    pub fn to_els(&self) -> ElsFrame {
        ElsFrame {
            command: ElsCommand::LS_RJT,
            payload: alloc::vec![0, self.reason, self.explanation, 0],
        }
    }

    pub fn from_els(frame: &ElsFrame) -> Result<Self, DecodeError> {
        DecodeError::check_len("LS_RJT", 4, &frame.payload)?;
        Ok(Self {
            reason: frame.payload[1],
            explanation: frame.payload[2],
        })
    }
}
