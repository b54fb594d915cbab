//! Symbolic channel-name resolution.
//!
//! T-series registers are addressed by number on the wire, but configuration
//! names them symbolically (`AIN0`, `DAC0`, `STREAM_OUT0`). This module holds
//! the slice of the Modbus register map the streaming core needs:
//!
//! - `AIN{n}` → `2n` (analog inputs are 32-bit floats, two registers wide)
//! - `DAC{n}` → `1000 + 2n`
//! - `STREAM_OUT{n}` → `4800 + n`, `n < 4` (stream-out pseudo-channels)
//!
//! Unrecognized names fail with [`StreamError::UnknownChannel`].

use crate::error::{StreamError, StreamResult};
use crate::stream::scan::MAX_STREAM_OUT_SLOTS;

/// Base register address of `DAC0`.
pub const DAC_BASE_ADDRESS: u32 = 1000;

/// Base register address of the `STREAM_OUT0` pseudo-channel.
pub const STREAM_OUT_BASE_ADDRESS: u32 = 4800;

/// Resolve one symbolic channel name to its register address.
pub fn resolve_name(name: &str) -> StreamResult<u32> {
    if let Some(index) = parse_index(name, "AIN") {
        return Ok(index * 2);
    }
    if let Some(index) = parse_index(name, "DAC") {
        if index < 2 {
            return Ok(DAC_BASE_ADDRESS + index * 2);
        }
    }
    if let Some(index) = parse_index(name, "STREAM_OUT") {
        if (index as usize) < MAX_STREAM_OUT_SLOTS {
            return Ok(STREAM_OUT_BASE_ADDRESS + index);
        }
    }
    Err(StreamError::UnknownChannel(name.to_string()))
}

/// Resolve an ordered list of names, preserving order.
pub fn resolve_names<S: AsRef<str>>(names: &[S]) -> StreamResult<Vec<u32>> {
    names.iter().map(|n| resolve_name(n.as_ref())).collect()
}

/// Stream-out slot index (0–3) encoded in a `STREAM_OUT{n}` name.
pub fn stream_out_slot(name: &str) -> StreamResult<u8> {
    match parse_index(name, "STREAM_OUT") {
        Some(index) if (index as usize) < MAX_STREAM_OUT_SLOTS => Ok(index as u8),
        _ => Err(StreamError::UnknownChannel(name.to_string())),
    }
}

fn parse_index(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || digits.len() > 3 {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_analog_inputs() {
        // Same order and addresses the acquisition config uses.
        let addrs = resolve_names(&["AIN0", "AIN3", "AIN2", "AIN1"]).unwrap();
        assert_eq!(addrs, vec![0, 6, 4, 2]);
    }

    #[test]
    fn resolves_dac_and_stream_out() {
        assert_eq!(resolve_name("DAC0").unwrap(), 1000);
        assert_eq!(resolve_name("DAC1").unwrap(), 1002);
        assert_eq!(resolve_name("STREAM_OUT0").unwrap(), 4800);
        assert_eq!(resolve_name("STREAM_OUT3").unwrap(), 4803);
    }

    #[test]
    fn rejects_unknown_names() {
        for name in ["FIO4", "AIN", "STREAM_OUT4", "DAC7", "ain0", ""] {
            let err = resolve_name(name).unwrap_err();
            assert!(
                matches!(err, StreamError::UnknownChannel(ref n) if n == name),
                "expected UnknownChannel for {name:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn extracts_stream_out_slot() {
        assert_eq!(stream_out_slot("STREAM_OUT0").unwrap(), 0);
        assert_eq!(stream_out_slot("STREAM_OUT3").unwrap(), 3);
        assert!(stream_out_slot("STREAM_OUT4").is_err());
        assert!(stream_out_slot("DAC0").is_err());
    }
}
