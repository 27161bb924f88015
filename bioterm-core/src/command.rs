//! Protocol command codes

use std::fmt;

/// Command codes used by the client.
///
/// Requests go from host to terminal; the terminal answers with one of the
/// ack codes in place of an echoed command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    // Database operations
    SetUser = 8,
    UserTempRrq = 9,
    Options = 11,
    OptionsWrq = 12,
    AttLogRrq = 13,
    ClearData = 14,
    ClearAttLog = 15,
    DeleteUser = 18,
    ClearAdmin = 20,
    GetFreeSizes = 50,

    // Display
    WriteLcd = 66,
    ClearLcd = 67,

    // Clock
    GetTime = 201,
    SetTime = 202,

    // Real-time events
    RegEvent = 500,

    // Connection lifecycle
    Connect = 1000,
    Exit = 1001,
    EnableDevice = 1002,
    DisableDevice = 1003,
    Restart = 1004,
    PowerOff = 1005,
    Sleep = 1006,
    Resume = 1007,
    TestVoice = 1017,
    GetVersion = 1100,
    Auth = 1102,

    // Bulk transfer
    PrepareData = 1500,
    Data = 1501,
    FreeData = 1502,

    // Responses (from terminal)
    AckOk = 2000,
    AckError = 2001,
    AckData = 2002,
    AckUnauth = 2005,
}

impl Command {
    /// Raw wire code
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Look up a known command by wire code
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            8 => Self::SetUser,
            9 => Self::UserTempRrq,
            11 => Self::Options,
            12 => Self::OptionsWrq,
            13 => Self::AttLogRrq,
            14 => Self::ClearData,
            15 => Self::ClearAttLog,
            18 => Self::DeleteUser,
            20 => Self::ClearAdmin,
            50 => Self::GetFreeSizes,
            66 => Self::WriteLcd,
            67 => Self::ClearLcd,
            201 => Self::GetTime,
            202 => Self::SetTime,
            500 => Self::RegEvent,
            1000 => Self::Connect,
            1001 => Self::Exit,
            1002 => Self::EnableDevice,
            1003 => Self::DisableDevice,
            1004 => Self::Restart,
            1005 => Self::PowerOff,
            1006 => Self::Sleep,
            1007 => Self::Resume,
            1017 => Self::TestVoice,
            1100 => Self::GetVersion,
            1102 => Self::Auth,
            1500 => Self::PrepareData,
            1501 => Self::Data,
            1502 => Self::FreeData,
            2000 => Self::AckOk,
            2001 => Self::AckError,
            2002 => Self::AckData,
            2005 => Self::AckUnauth,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SetUser => "CMD_USER_WRQ",
            Self::UserTempRrq => "CMD_USERTEMP_RRQ",
            Self::Options => "CMD_OPTIONS_RRQ",
            Self::OptionsWrq => "CMD_OPTIONS_WRQ",
            Self::AttLogRrq => "CMD_ATTLOG_RRQ",
            Self::ClearData => "CMD_CLEAR_DATA",
            Self::ClearAttLog => "CMD_CLEAR_ATTLOG",
            Self::DeleteUser => "CMD_DELETE_USER",
            Self::ClearAdmin => "CMD_CLEAR_ADMIN",
            Self::GetFreeSizes => "CMD_GET_FREE_SIZES",
            Self::WriteLcd => "CMD_WRITE_LCD",
            Self::ClearLcd => "CMD_CLEAR_LCD",
            Self::GetTime => "CMD_GET_TIME",
            Self::SetTime => "CMD_SET_TIME",
            Self::RegEvent => "CMD_REG_EVENT",
            Self::Connect => "CMD_CONNECT",
            Self::Exit => "CMD_EXIT",
            Self::EnableDevice => "CMD_ENABLEDEVICE",
            Self::DisableDevice => "CMD_DISABLEDEVICE",
            Self::Restart => "CMD_RESTART",
            Self::PowerOff => "CMD_POWEROFF",
            Self::Sleep => "CMD_SLEEP",
            Self::Resume => "CMD_RESUME",
            Self::TestVoice => "CMD_TESTVOICE",
            Self::GetVersion => "CMD_GET_VERSION",
            Self::Auth => "CMD_AUTH",
            Self::PrepareData => "CMD_PREPARE_DATA",
            Self::Data => "CMD_DATA",
            Self::FreeData => "CMD_FREE_DATA",
            Self::AckOk => "CMD_ACK_OK",
            Self::AckError => "CMD_ACK_ERROR",
            Self::AckData => "CMD_ACK_DATA",
            Self::AckUnauth => "CMD_ACK_UNAUTH",
        }
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u16)
    }
}
