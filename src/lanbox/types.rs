//! LanBox protocol types and constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Cue list commands
pub(crate) const OP_CLEAR_CUE_LIST: &[u8; 3] = b"*5A";
pub(crate) const OP_DELETE_STEP: &[u8; 3] = b"*5B";
pub(crate) const OP_INSERT_STEP: &[u8; 3] = b"*5C";
pub(crate) const OP_LOAD_CUE_LIST: &[u8; 3] = b"*5D";
pub(crate) const OP_SAVE_CUE_LIST: &[u8; 3] = b"*5E";
pub(crate) const OP_CREATE_CUE_LIST: &[u8; 3] = b"*5F";

// Layer commands
pub(crate) const OP_MIX_MODE: &[u8; 3] = b"*47";
pub(crate) const OP_LAYER_NAME: &[u8; 3] = b"*48";
pub(crate) const OP_LAYER_STATUS: &[u8; 3] = b"*49";
pub(crate) const OP_LAYER_PRIORITY: &[u8; 3] = b"*4A";
pub(crate) const OP_TRANSPARENCY: &[u8; 3] = b"*63";

// Patch commands
pub(crate) const OP_GET_PATCH: &[u8; 3] = b"*80";
pub(crate) const OP_PATCH: &[u8; 3] = b"*81";
pub(crate) const OP_GAIN: &[u8; 3] = b"*82";

// System commands
pub(crate) const OP_FACTORY_RESET: &[u8; 3] = b"*B1";
pub(crate) const OP_SAVE_CONFIG: &[u8; 3] = b"*B2";
pub(crate) const OP_SYSTEM_INFO: &[u8; 3] = b"*B3";

/// Command frame terminator (`#`).
pub const TERMINATOR: u8 = 0x23;
/// Password frame terminator (carriage return).
pub const PASSWORD_TERMINATOR: u8 = 0x0D;
/// Leading byte of every opcode marker and response frame.
pub const FRAME_LEAD: u8 = b'*';

// Parameter bounds
pub(crate) const CUE_LIST_RANGE: (i64, i64) = (1, 999);
pub(crate) const LAYER_RANGE: (i64, i64) = (1, 63);
pub(crate) const STEP_RANGE: (i64, i64) = (1, 99);
pub(crate) const DMX_RANGE: (i64, i64) = (1, 512);
pub(crate) const MIXER_RANGE: (i64, i64) = (0, 3072);
pub(crate) const MIX_MODE_RANGE: (i64, i64) = (0, 4);

/// Layer names are cut to this many characters before encoding.
pub const MAX_LAYER_NAME_LEN: usize = 15;
/// Longest password the controller accepts.
pub const MAX_PASSWORD_LEN: usize = 15;

/// One controller operation with its raw parameters.
///
/// Parameters are carried unvalidated; `encode` rejects anything outside the
/// protocol bounds before producing a byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    CreateCueList { id: u16 },
    LoadCueList { id: u16 },
    SaveCueList { id: u16 },
    ClearCueList { id: u16 },
    InsertStep { layer: u8, step: u8 },
    AppendStep { layer: u8 },
    DeleteStep { layer: u8, step: u8 },
    SetMixMode { layer: u8, mode: u8 },
    SetTransparency { layer: u8, depth: u8 },
    GetLayerStatus { layer: u8 },
    SetLayerName { layer: u8, name: String },
    SetLayerPriority { layer: u8, priority: u8 },
    PatchChannel { dmx: u16, mixer: u16 },
    GetPatch { dmx: u16 },
    SetGain { dmx: u16, gain: u8 },
    GetGain { dmx: u16 },
    FactoryReset,
    SaveConfiguration,
    GetSystemInfo,
}

impl Command {
    /// Opcode marker written at the start of the frame.
    pub fn opcode(&self) -> &'static [u8; 3] {
        match self {
            Command::CreateCueList { .. } => OP_CREATE_CUE_LIST,
            Command::LoadCueList { .. } => OP_LOAD_CUE_LIST,
            Command::SaveCueList { .. } => OP_SAVE_CUE_LIST,
            Command::ClearCueList { .. } => OP_CLEAR_CUE_LIST,
            Command::InsertStep { .. } | Command::AppendStep { .. } => OP_INSERT_STEP,
            Command::DeleteStep { .. } => OP_DELETE_STEP,
            Command::SetMixMode { .. } => OP_MIX_MODE,
            Command::SetTransparency { .. } => OP_TRANSPARENCY,
            Command::GetLayerStatus { .. } => OP_LAYER_STATUS,
            Command::SetLayerName { .. } => OP_LAYER_NAME,
            Command::SetLayerPriority { .. } => OP_LAYER_PRIORITY,
            Command::PatchChannel { .. } => OP_PATCH,
            Command::GetPatch { .. } => OP_GET_PATCH,
            Command::SetGain { .. } | Command::GetGain { .. } => OP_GAIN,
            Command::FactoryReset => OP_FACTORY_RESET,
            Command::SaveConfiguration => OP_SAVE_CONFIG,
            Command::GetSystemInfo => OP_SYSTEM_INFO,
        }
    }

    /// Shape of the reply the controller sends for this command.
    pub fn reply_kind(&self) -> ReplyKind {
        match self {
            Command::GetLayerStatus { .. }
            | Command::GetPatch { .. }
            | Command::GetGain { .. }
            | Command::GetSystemInfo => ReplyKind::Data,
            _ => ReplyKind::Ack,
        }
    }

    /// Short human-readable name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateCueList { .. } => "CreateCueList",
            Command::LoadCueList { .. } => "LoadCueList",
            Command::SaveCueList { .. } => "SaveCueList",
            Command::ClearCueList { .. } => "ClearCueList",
            Command::InsertStep { .. } => "InsertStep",
            Command::AppendStep { .. } => "AppendStep",
            Command::DeleteStep { .. } => "DeleteStep",
            Command::SetMixMode { .. } => "SetMixMode",
            Command::SetTransparency { .. } => "SetTransparency",
            Command::GetLayerStatus { .. } => "GetLayerStatus",
            Command::SetLayerName { .. } => "SetLayerName",
            Command::SetLayerPriority { .. } => "SetLayerPriority",
            Command::PatchChannel { .. } => "PatchChannel",
            Command::GetPatch { .. } => "GetPatch",
            Command::SetGain { .. } => "SetGain",
            Command::GetGain { .. } => "GetGain",
            Command::FactoryReset => "FactoryReset",
            Command::SaveConfiguration => "SaveConfiguration",
            Command::GetSystemInfo => "GetSystemInfo",
        }
    }
}

/// Expected response shape, used by the decoder to reject short frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Bare acknowledgement: `*#`.
    Ack,
    /// Opcode echo plus at least one payload byte: `*XX..#`.
    Data,
}

impl ReplyKind {
    /// Smallest complete frame, terminator included.
    pub fn min_frame_len(self) -> usize {
        match self {
            ReplyKind::Ack => 2,
            ReplyKind::Data => 5,
        }
    }
}

/// Layer mix modes, in controller index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixMode {
    Off,
    Normal,
    Additive,
    Subtractive,
    Transparent,
}

impl MixMode {
    pub const ALL: [MixMode; 5] = [
        MixMode::Off,
        MixMode::Normal,
        MixMode::Additive,
        MixMode::Subtractive,
        MixMode::Transparent,
    ];

    /// Wire index of this mode.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl From<MixMode> for u8 {
    fn from(mode: MixMode) -> Self {
        mode.index()
    }
}

impl fmt::Display for MixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MixMode::Off => "off",
            MixMode::Normal => "normal",
            MixMode::Additive => "additive",
            MixMode::Subtractive => "subtractive",
            MixMode::Transparent => "transparent",
        };
        f.write_str(name)
    }
}

impl FromStr for MixMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Ok(index) = lower.parse::<u8>() {
            return Self::from_index(index).ok_or_else(|| format!("mix mode index {index} out of range 0..=4"));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.to_string() == lower)
            .ok_or_else(|| format!("unknown mix mode '{s}'"))
    }
}

/// Link layer carrying the byte stream. Informational only: frames are identical on every transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Serial,
    #[default]
    Tcp,
    Midi,
    Udp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Serial => "Serial",
            TransportKind::Tcp => "TCP/IP",
            TransportKind::Midi => "MIDI",
            TransportKind::Udp => "UDP",
        };
        f.write_str(name)
    }
}

/// Whether `send` waits for a reply frame before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Write and return; the controller's reaction is not checked.
    #[default]
    FireAndForget,
    /// Read one reply frame per command, bounded by the response timeout.
    WaitForAck,
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
