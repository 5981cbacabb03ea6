//! Formatting of primitive values and character data.

use memlayout::{le_unsigned, BaseType};

fn le_signed(bytes: &[u8]) -> i64 {
    let n = bytes.len().min(8);
    if n == 0 {
        return 0;
    }
    let shift = 64 - n * 8;
    ((le_unsigned(bytes) << shift) as i64) >> shift
}

/// Numeric view of a primitive, used for plots.
pub fn as_f64(bytes: &[u8], base: &BaseType) -> Option<f64> {
    match (base.kind.as_str(), bytes.len()) {
        ("float", 4) => Some(f32::from_le_bytes(bytes.try_into().ok()?) as f64),
        ("float", 8) => Some(f64::from_le_bytes(bytes.try_into().ok()?)),
        ("float", _) => None,
        (_, 0) => None,
        _ if base.signed => Some(le_signed(bytes) as f64),
        _ => Some(le_unsigned(bytes) as f64),
    }
}

/// Display text of a primitive.
pub fn format_base(bytes: &[u8], base: &BaseType) -> String {
    match base.kind.as_str() {
        "float" => match as_f64(bytes, base) {
            Some(v) => format!("{}", v),
            None => format!("<{}-byte float>", bytes.len()),
        },
        "bool" => {
            if le_unsigned(bytes) != 0 {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        "char" => {
            let code = le_unsigned(bytes);
            let shown = if base.signed { le_signed(bytes).to_string() } else { code.to_string() };
            match char::from_u32(code as u32) {
                Some(c) if bytes.len() <= 4 && !c.is_control() && code != 0 => {
                    format!("{} '{}'", shown, c)
                }
                _ => shown,
            }
        }
        _ if base.signed => le_signed(bytes).to_string(),
        _ => le_unsigned(bytes).to_string(),
    }
}

/// Decode character data of the given code unit width.
///
/// Width 1 is Latin-1 or UTF-8, width 2 is UTF-16LE, width 4 is UTF-32LE.
/// Invalid sequences become U+FFFD.
pub fn decode_chars(bytes: &[u8], width: usize, latin1: bool) -> String {
    match width {
        2 => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        4 => bytes
            .chunks_exact(4)
            .map(|c| {
                char::from_u32(u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect(),
        _ if latin1 => bytes.iter().map(|&b| b as char).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ints() {
        let int = BaseType::new(4, true, "int");
        assert_eq!(format_base(&(-42i32).to_le_bytes(), &int), "-42");
        let uint = BaseType::new(4, false, "int");
        assert_eq!(format_base(&u32::MAX.to_le_bytes(), &uint), "4294967295");
        let byte = BaseType::new(1, false, "int");
        assert_eq!(format_base(&[200], &byte), "200");
    }

    #[test]
    fn test_format_floats_and_bools() {
        let float = BaseType::new(4, true, "float");
        assert_eq!(format_base(&1.5f32.to_le_bytes(), &float), "1.5");
        let double = BaseType::new(8, true, "float");
        assert_eq!(format_base(&(-0.25f64).to_le_bytes(), &double), "-0.25");
        let b = BaseType::new(1, false, "bool");
        assert_eq!(format_base(&[1], &b), "true");
        assert_eq!(format_base(&[0], &b), "false");
    }

    #[test]
    fn test_format_chars() {
        let c = BaseType::new(1, true, "char");
        assert_eq!(format_base(b"A", &c), "65 'A'");
        assert_eq!(format_base(&[0], &c), "0");
        assert_eq!(format_base(&[0xff], &c), "-1 'ÿ'");
    }

    #[test]
    fn test_decode_chars() {
        assert_eq!(decode_chars("héllo".as_bytes(), 1, false), "héllo");
        assert_eq!(decode_chars(&[0x68, 0xe9], 1, true), "hé");
        assert_eq!(decode_chars(&[0x68, 0xe9], 1, false), "h\u{fffd}");

        let utf16: Vec<u8> = "モデル".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(decode_chars(&utf16, 2, false), "モデル");

        let utf32: Vec<u8> = "ボーン".chars().flat_map(|c| (c as u32).to_le_bytes()).collect();
        assert_eq!(decode_chars(&utf32, 4, false), "ボーン");
    }

    #[test]
    fn test_plot_values() {
        let int = BaseType::new(2, true, "int");
        assert_eq!(as_f64(&(-3i16).to_le_bytes(), &int), Some(-3.0));
        let float = BaseType::new(4, true, "float");
        assert_eq!(as_f64(&2.5f32.to_le_bytes(), &float), Some(2.5));
        let long_double = BaseType::new(16, true, "float");
        assert_eq!(as_f64(&[0u8; 16], &long_double), None);
    }
}
