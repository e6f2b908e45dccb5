//! LanBox command frame building.

use super::types::{
    CUE_LIST_RANGE, Command, DMX_RANGE, LAYER_RANGE, MAX_LAYER_NAME_LEN, MAX_PASSWORD_LEN, MIX_MODE_RANGE,
    MIXER_RANGE, PASSWORD_TERMINATOR, STEP_RANGE, TERMINATOR,
};
use crate::error::{AppError, Result};

/// Check `value` against an inclusive protocol bound.
fn check_range(field: &'static str, value: impl Into<i64>, (min, max): (i64, i64)) -> Result<()> {
    let value = value.into();
    if value < min || value > max {
        return Err(AppError::range(field, value, min, max));
    }
    Ok(())
}

/// Encode a command into its wire frame.
///
/// Frame structure:
/// - Opcode marker (3 bytes, e.g. `*5F`)
/// - Parameters (8-bit, or 16-bit big-endian)
/// - Terminator `#`
///
/// Every parameter is validated before anything is written, so an error
/// never comes with a partial frame.
pub fn encode(command: &Command) -> Result<Vec<u8>> {
    let mut params: Vec<u8> = Vec::with_capacity(2 + MAX_LAYER_NAME_LEN);

    match command {
        Command::CreateCueList { id }
        | Command::LoadCueList { id }
        | Command::SaveCueList { id }
        | Command::ClearCueList { id } => {
            check_range("cue list id", *id, CUE_LIST_RANGE)?;
            params.extend_from_slice(&id.to_be_bytes());
        }
        Command::InsertStep { layer, step } | Command::DeleteStep { layer, step } => {
            check_range("layer", *layer, LAYER_RANGE)?;
            check_range("step", *step, STEP_RANGE)?;
            params.extend_from_slice(&[*layer, *step]);
        }
        Command::AppendStep { layer } | Command::GetLayerStatus { layer } => {
            check_range("layer", *layer, LAYER_RANGE)?;
            params.push(*layer);
        }
        Command::SetMixMode { layer, mode } => {
            check_range("layer", *layer, LAYER_RANGE)?;
            check_range("mix mode", *mode, MIX_MODE_RANGE)?;
            params.extend_from_slice(&[*layer, *mode]);
        }
        // Depth and priority span the full byte
        Command::SetTransparency { layer, depth: value } | Command::SetLayerPriority { layer, priority: value } => {
            check_range("layer", *layer, LAYER_RANGE)?;
            params.extend_from_slice(&[*layer, *value]);
        }
        Command::SetLayerName { layer, name } => {
            check_range("layer", *layer, LAYER_RANGE)?;
            let name = encode_layer_name(name)?;
            params.push(*layer);
            params.push(name.len() as u8);
            params.extend_from_slice(&name);
        }
        Command::PatchChannel { dmx, mixer } => {
            check_range("DMX channel", *dmx, DMX_RANGE)?;
            check_range("mixer channel", *mixer, MIXER_RANGE)?;
            params.extend_from_slice(&dmx.to_be_bytes());
            params.extend_from_slice(&mixer.to_be_bytes());
        }
        Command::GetPatch { dmx } | Command::GetGain { dmx } => {
            check_range("DMX channel", *dmx, DMX_RANGE)?;
            params.extend_from_slice(&dmx.to_be_bytes());
        }
        Command::SetGain { dmx, gain } => {
            check_range("DMX channel", *dmx, DMX_RANGE)?;
            params.extend_from_slice(&dmx.to_be_bytes());
            params.push(*gain);
        }
        Command::FactoryReset | Command::SaveConfiguration | Command::GetSystemInfo => {}
    }

    let opcode = command.opcode();
    let mut frame = Vec::with_capacity(opcode.len() + params.len() + 1);
    frame.extend_from_slice(opcode);
    frame.extend_from_slice(&params);
    frame.push(TERMINATOR);

    Ok(frame)
}

/// Cut a layer name to its first 15 characters and check it is ASCII.
///
/// The result is sent length-prefixed, so a `#` inside the name is allowed.
pub(crate) fn encode_layer_name(name: &str) -> Result<Vec<u8>> {
    let truncated: String = name.chars().take(MAX_LAYER_NAME_LEN).collect();
    if !truncated.is_ascii() {
        return Err(AppError::InvalidText(format!("layer name '{truncated}' is not ASCII")));
    }
    Ok(truncated.into_bytes())
}

/// Encode the authentication frame: raw password bytes followed by CR.
pub fn encode_password(password: &str) -> Result<Vec<u8>> {
    if password.is_empty() || password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::Length {
            field: "password",
            len: password.len(),
            max: MAX_PASSWORD_LEN,
        });
    }
    if !password.is_ascii() {
        return Err(AppError::InvalidText("password is not ASCII".to_string()));
    }
    if password.bytes().any(|b| b == PASSWORD_TERMINATOR) {
        return Err(AppError::InvalidText("password contains a carriage return".to_string()));
    }

    let mut frame = Vec::with_capacity(password.len() + 1);
    frame.extend_from_slice(password.as_bytes());
    frame.push(PASSWORD_TERMINATOR);
    Ok(frame)
}

/// Render bytes as space-separated hex.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}
