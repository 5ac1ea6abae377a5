use crate::foundation::error::{FestoonError, FestoonResult};

pub use kurbo::{Point, Vec2};

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Parses `#rgb` or `#rrggbb` into an opaque premultiplied color.
pub fn parse_hex_color(s: &str) -> FestoonResult<Rgba8Premul> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    // Byte-indexed slicing below is only safe once every byte is an ASCII
    // hex digit; this also rejects multi-byte characters.
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FestoonError::validation(format!("invalid hex color {s:?}")));
    }
    let digits = match hex.len() {
        3 => {
            let mut out = String::with_capacity(6);
            for ch in hex.chars() {
                out.push(ch);
                out.push(ch);
            }
            out
        }
        6 => hex.to_string(),
        _ => {
            return Err(FestoonError::validation(format!(
                "hex color must be 3 or 6 digits, got {s:?}"
            )));
        }
    };

    let parse_pair = |i: usize| -> FestoonResult<u8> {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map_err(|_| FestoonError::validation(format!("invalid hex color {s:?}")))
    };

    Ok(Rgba8Premul::from_straight_rgba(
        parse_pair(0)?,
        parse_pair(2)?,
        parse_pair(4)?,
        255,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_halves_half_alpha() {
        let c = Rgba8Premul::from_straight_rgba(200, 100, 0, 128);
        assert_eq!(c.a, 128);
        assert!(c.r.abs_diff(100) <= 1);
        assert!(c.g.abs_diff(50) <= 1);
        assert_eq!(c.b, 0);
    }

    #[test]
    fn hex_parsing_accepts_short_and_long_forms() {
        let long = parse_hex_color("#ff8000").unwrap();
        assert_eq!((long.r, long.g, long.b, long.a), (255, 128, 0, 255));

        let short = parse_hex_color("#f80").unwrap();
        assert_eq!((short.r, short.g, short.b), (255, 136, 0));

        let bare = parse_hex_color("ff8000").unwrap();
        assert_eq!(bare, long);
    }

    #[test]
    fn hex_parsing_rejects_garbage() {
        assert!(parse_hex_color("#zzz").is_err());
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("").is_err());
    }

    #[test]
    fn hex_parsing_rejects_multibyte_input_without_panicking() {
        // 6 bytes but 2 chars: slicing by byte index must not be reached.
        assert!(parse_hex_color("#€€").is_err());
        assert!(parse_hex_color("€€").is_err());
        assert!(parse_hex_color("#ffé").is_err());
    }
}
