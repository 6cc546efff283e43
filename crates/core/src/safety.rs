//! Safety layer: checks every caller-supplied value against the width of
//! the wire field it will occupy before any frame is built.
//!
//! Nothing here clamps, truncates, or wraps. A value that does not fit is an
//! [`Error::OutOfRange`] naming the field.
//!
//! ## Field widths
//! - `u8`: flags-adjacent settings (`interval_override`, `constraint_mode`),
//!   mapping `layer`, screen `index`
//! - `u32`: timeouts, sensitivities, geometry, usage codes, indices of GET queries
//! - `i32`: mapping `scaling`
//!
//! ## Screens
//! The device has exactly [`NSCREENS`] screen slots. Screen indices must be
//! below that, and a document cannot carry more screens than slots.

use crate::error::{Error, Result};
use crate::records::NSCREENS;

/// Narrow a value into a `u8` field.
pub fn narrow_u8(field: &'static str, value: i64) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::OutOfRange {
        field,
        value,
        min: 0,
        max: u8::MAX as i64,
    })
}

/// Narrow a value into a `u32` field.
pub fn narrow_u32(field: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::OutOfRange {
        field,
        value,
        min: 0,
        max: u32::MAX as i64,
    })
}

/// Narrow a value into an `i32` field.
pub fn narrow_i32(field: &'static str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::OutOfRange {
        field,
        value,
        min: i32::MIN as i64,
        max: i32::MAX as i64,
    })
}

/// Validate a screen slot index.
pub fn validate_screen_index(index: usize) -> Result<u8> {
    if index >= NSCREENS {
        return Err(Error::OutOfRange {
            field: "screen_index",
            value: index as i64,
            min: 0,
            max: (NSCREENS - 1) as i64,
        });
    }
    Ok(index as u8)
}

/// Validate the number of screens in a configuration.
pub fn validate_screen_count(count: usize) -> Result<()> {
    if count > NSCREENS {
        return Err(Error::OutOfRange {
            field: "screen_count",
            value: count as i64,
            min: 0,
            max: NSCREENS as i64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_u8_in_range() {
        assert_eq!(narrow_u8("layer", 0).unwrap(), 0);
        assert_eq!(narrow_u8("layer", 255).unwrap(), 255);
    }

    #[test]
    fn narrow_u8_rejects_wide_values() {
        match narrow_u8("layer", 256) {
            Err(Error::OutOfRange {
                field, value, max, ..
            }) => {
                assert_eq!(field, "layer");
                assert_eq!(value, 256);
                assert_eq!(max, 255);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(narrow_u8("layer", -1).is_err());
    }

    #[test]
    fn narrow_u32_bounds() {
        assert_eq!(narrow_u32("x", 4_294_967_295).unwrap(), u32::MAX);
        assert!(narrow_u32("x", 4_294_967_296).is_err());
        assert!(narrow_u32("x", -5).is_err());
    }

    #[test]
    fn narrow_i32_keeps_sign() {
        assert_eq!(narrow_i32("scaling", -500).unwrap(), -500);
        assert!(narrow_i32("scaling", i64::from(i32::MIN) - 1).is_err());
        assert!(narrow_i32("scaling", i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn screen_index_bounds() {
        assert_eq!(validate_screen_index(0).unwrap(), 0);
        assert_eq!(validate_screen_index(1).unwrap(), 1);
        assert!(validate_screen_index(2).is_err());
    }

    #[test]
    fn screen_count_bounds() {
        assert!(validate_screen_count(0).is_ok());
        assert!(validate_screen_count(NSCREENS).is_ok());
        assert!(validate_screen_count(NSCREENS + 1).is_err());
    }
}
