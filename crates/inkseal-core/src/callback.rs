// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark callback parsing.
//
// Buttons in the chat UI carry pipe-delimited option strings:
//
//   #wa|txt|op08|M|R    text, opacity 8, middle, red
//   #wa|img|op05|T      image, opacity 5, top
//
// Fields are positional. Only structural problems are errors; unknown
// position, colour, or opacity codes are replaced by defaults.

use tracing::debug;

use crate::error::{InksealError, Result};
use crate::types::{NamedColor, Opacity, Position, WatermarkKind, WatermarkOptions};

/// Prefix shared by every watermark callback.
pub const CALLBACK_PREFIX: &str = "wa";

/// Parse a watermark callback string into normalised options.
pub fn parse_callback(data: &str) -> Result<WatermarkOptions> {
    let trimmed = data.trim();
    let body = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let fields: Vec<&str> = body.split('|').collect();

    if fields.first().map(|f| f.trim()) != Some(CALLBACK_PREFIX) {
        return Err(InksealError::InvalidCallback(format!(
            "expected '{CALLBACK_PREFIX}' prefix in {data:?}"
        )));
    }
    if fields.len() < 4 {
        return Err(InksealError::InvalidCallback(format!(
            "expected at least 4 fields, got {} in {data:?}",
            fields.len()
        )));
    }

    let kind = WatermarkKind::from_code(fields[1]).ok_or_else(|| {
        InksealError::InvalidCallback(format!("unknown watermark type {:?}", fields[1]))
    })?;
    let opacity = Opacity::from_token(fields[2]);
    let position = Position::from_code(fields[3]);

    // Only text watermarks carry a colour; everything else draws in black.
    let color = match (kind, fields.get(4)) {
        (WatermarkKind::Text, Some(code)) => NamedColor::from_code(code),
        _ => NamedColor::Black,
    };

    let options = WatermarkOptions {
        kind,
        opacity,
        position,
        color,
    };
    debug!(?options, "callback parsed");
    Ok(options)
}

impl WatermarkOptions {
    /// Render the canonical callback string for these options.
    pub fn to_callback(&self) -> String {
        let base = format!(
            "#{CALLBACK_PREFIX}|{}|op{:02}|{}",
            self.kind.code(),
            self.opacity.level(),
            self.position.code()
        );
        match self.kind {
            WatermarkKind::Text => format!("{base}|{}", self.color.code()),
            _ => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_callback() {
        let opts = parse_callback("#wa|txt|op08|M|R").unwrap();
        assert_eq!(opts.kind, WatermarkKind::Text);
        assert_eq!(opts.opacity.level(), 8);
        assert_eq!(opts.position, Position::Middle);
        assert_eq!(opts.color, NamedColor::Red);
    }

    #[test]
    fn parses_image_callback_without_color() {
        let opts = parse_callback("#wa|img|op05|T").unwrap();
        assert_eq!(opts.kind, WatermarkKind::Image);
        assert_eq!(opts.position, Position::Top);
        assert_eq!(opts.color, NamedColor::Black);
    }

    #[test]
    fn unknown_codes_are_defaulted_not_rejected() {
        let opts = parse_callback("#wa|txt|opzz|Q|P").unwrap();
        assert_eq!(opts.position, Position::Middle);
        assert_eq!(opts.color, NamedColor::Black);
        assert_eq!(opts.opacity.level(), Opacity::DEFAULT);
    }

    #[test]
    fn text_callback_without_color_is_black() {
        let opts = parse_callback("wa|txt|op03|B").unwrap();
        assert_eq!(opts.color, NamedColor::Black);
        assert_eq!(opts.position, Position::Bottom);
    }

    #[test]
    fn structural_errors_are_rejected() {
        assert!(matches!(
            parse_callback("#xx|txt|op08|M|R"),
            Err(InksealError::InvalidCallback(_))
        ));
        assert!(matches!(
            parse_callback("#wa|txt|op08"),
            Err(InksealError::InvalidCallback(_))
        ));
        assert!(matches!(
            parse_callback("#wa|gif|op08|M"),
            Err(InksealError::InvalidCallback(_))
        ));
    }

    #[test]
    fn canonical_string_matches_input() {
        for data in ["#wa|txt|op08|M|R", "#wa|img|op05|T", "#wa|pdf|op10|B"] {
            assert_eq!(parse_callback(data).unwrap().to_callback(), data);
        }
    }
}
