//! CSS color and gradient value parser.
//!
//! Template colors and background preset values are written in CSS syntax
//! (`#1a7f37`, `rgba(0, 0, 0, 0.5)`, `linear-gradient(135deg, #667eea 0%,
//! #764ba2 100%)`). Built on `winnow` 0.7.

use crate::error::ParseError;
use crate::model::{Color, GradientStop};
use smallvec::SmallVec;
use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// A parsed CSS linear gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct CssGradient {
    /// Direction in degrees (CSS convention: 0 = to top, 90 = to right).
    pub angle: f32,
    /// Stops with offsets normalized to 0.0 ..= 1.0.
    pub stops: SmallVec<[GradientStop; 2]>,
    /// `repeating-linear-gradient(...)`.
    pub repeating: bool,
}

/// Parse a single CSS color value.
pub fn parse_color(value: &str) -> Result<Color, ParseError> {
    let mut input = value.trim();
    let color = parse_color_value
        .parse_next(&mut input)
        .map_err(|_| ParseError::InvalidColor(value.to_string()))?;
    if !input.trim().is_empty() {
        return Err(ParseError::InvalidColor(value.to_string()));
    }
    Ok(color)
}

/// Parse a `linear-gradient(...)` or `repeating-linear-gradient(...)` value.
pub fn parse_gradient(value: &str) -> Result<CssGradient, ParseError> {
    let mut input = value.trim();
    let gradient = parse_gradient_value
        .parse_next(&mut input)
        .map_err(|e| ParseError::InvalidGradient(format!("{value}: {e}")))?;
    if !input.trim().is_empty() {
        return Err(ParseError::InvalidGradient(value.to_string()));
    }
    if gradient.stops.len() < 2 {
        return Err(ParseError::InvalidGradient(format!(
            "{value}: a gradient needs at least two stops"
        )));
    }
    Ok(gradient)
}

// ─── Low-level parsers ──────────────────────────────────────────────────

fn backtrack<T>() -> ModalResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    use winnow::ascii::multispace0;
    let _: Result<&str, ErrMode<ContextError>> = multispace0.parse_next(input);
}

fn comma(input: &mut &str) -> ModalResult<()> {
    skip_space(input);
    let _ = ','.parse_next(input)?;
    skip_space(input);
    Ok(())
}

fn parse_number(input: &mut &str) -> ModalResult<f32> {
    let start = *input;
    if input.starts_with('-') {
        *input = &input[1..];
    }
    let int: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let mut frac_len = 0;
    if input.starts_with('.') {
        *input = &input[1..];
        let frac: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        frac_len = frac.len();
    }
    if int.is_empty() && frac_len == 0 {
        *input = start;
        return backtrack();
    }
    let matched = &start[..start.len() - input.len()];
    matched
        .parse::<f32>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

fn parse_hex_color(input: &mut &str) -> ModalResult<Color> {
    let _ = '#'.parse_next(input)?;
    let hex_digits: &str = take_while(3..=8, |c: char| c.is_ascii_hexdigit()).parse_next(input)?;
    Color::from_hex(hex_digits).map_or_else(backtrack, Ok)
}

/// `rgb(r, g, b)` / `rgba(r, g, b, a)` with 0–255 channels and 0–1 alpha.
fn parse_rgb_function(input: &mut &str) -> ModalResult<Color> {
    let _ = alt(("rgba", "rgb")).parse_next(input)?;
    skip_space(input);
    let _ = '('.parse_next(input)?;
    skip_space(input);
    let r = parse_number.parse_next(input)?;
    comma(input)?;
    let g = parse_number.parse_next(input)?;
    comma(input)?;
    let b = parse_number.parse_next(input)?;
    let a = opt(preceded(comma, parse_number)).parse_next(input)?;
    skip_space(input);
    let _ = ')'.parse_next(input)?;
    let ch = |v: f32| (v / 255.0).clamp(0.0, 1.0);
    Ok(Color::rgba(ch(r), ch(g), ch(b), a.unwrap_or(1.0).clamp(0.0, 1.0)))
}

fn parse_named_color(input: &mut &str) -> ModalResult<Color> {
    let name: &str = take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    let color = match name.to_ascii_lowercase().as_str() {
        "white" => Color::WHITE,
        "black" => Color::BLACK,
        "transparent" => Color::TRANSPARENT,
        "red" => Color::rgb8(255, 0, 0),
        "green" => Color::rgb8(0, 128, 0),
        "blue" => Color::rgb8(0, 0, 255),
        "yellow" => Color::rgb8(255, 255, 0),
        "orange" => Color::rgb8(255, 165, 0),
        "gray" | "grey" => Color::rgb8(128, 128, 128),
        _ => return backtrack(),
    };
    Ok(color)
}

fn parse_color_value(input: &mut &str) -> ModalResult<Color> {
    alt((parse_hex_color, parse_rgb_function, parse_named_color)).parse_next(input)
}

/// `<number>deg` or `to <side>`.
fn parse_direction(input: &mut &str) -> ModalResult<f32> {
    alt((
        (parse_number, "deg").map(|(n, _)| n),
        preceded(
            ("to", winnow::ascii::space1),
            alt((
                "top right".value(45.0),
                "bottom right".value(135.0),
                "bottom left".value(225.0),
                "top left".value(315.0),
                "top".value(0.0),
                "right".value(90.0),
                "bottom".value(180.0),
                "left".value(270.0),
            )),
        ),
    ))
    .parse_next(input)
}

/// A color stop with an optional `%` or `px` position. Pixel positions are
/// kept raw and normalized against the last stop afterwards.
fn parse_stop(input: &mut &str) -> ModalResult<(Color, Option<(f32, bool)>)> {
    let color = parse_color_value.parse_next(input)?;
    skip_space(input);
    let pos = opt((parse_number, alt(("%".value(true), "px".value(false))))).parse_next(input)?;
    Ok((color, pos))
}

fn parse_gradient_value(input: &mut &str) -> ModalResult<CssGradient> {
    let repeating = opt("repeating-").parse_next(input)?.is_some();
    let _ = "linear-gradient".parse_next(input)?;
    skip_space(input);
    // Stops may contain `rgba(...)`, so the body is parsed in place rather
    // than sliced at the first ')'.
    let _ = '('.parse_next(input)?;
    skip_space(input);

    let angle = match opt(parse_direction).parse_next(input)? {
        Some(angle) => {
            comma(input)?;
            angle
        }
        None => 180.0,
    };

    let mut raw = vec![parse_stop.parse_next(input)?];
    while opt(comma).parse_next(input)?.is_some() {
        raw.push(parse_stop.parse_next(input)?);
    }
    skip_space(input);
    let _ = ')'.parse_next(input)?;

    Ok(CssGradient {
        angle,
        stops: normalize_stops(&raw),
        repeating,
    })
}

/// Resolve stop positions to 0..=1 offsets. Missing positions are spread
/// evenly; pixel positions are relative to the largest pixel position.
fn normalize_stops(raw: &[(Color, Option<(f32, bool)>)]) -> SmallVec<[GradientStop; 2]> {
    let px_extent = raw
        .iter()
        .filter_map(|(_, p)| p.filter(|(_, pct)| !pct).map(|(v, _)| v))
        .fold(0.0f32, f32::max);
    let last = raw.len().saturating_sub(1).max(1) as f32;
    raw.iter()
        .enumerate()
        .map(|(i, (color, pos))| {
            let offset = match pos {
                Some((v, true)) => v / 100.0,
                Some((v, false)) if px_extent > 0.0 => v / px_extent,
                _ => i as f32 / last,
            };
            GradientStop {
                offset: offset.clamp(0.0, 1.0),
                color: *color,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_named_colors() {
        assert_eq!(parse_color("#ffffff").unwrap(), Color::WHITE);
        assert_eq!(parse_color("  #000 ").unwrap(), Color::BLACK);
        assert_eq!(parse_color("White").unwrap(), Color::WHITE);
        assert!(parse_color("#zzzzzz").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn parses_rgba_function() {
        let c = parse_color("rgba(255, 0, 0, 0.5)").unwrap();
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.a - 0.5).abs() < f32::EPSILON);
        let c = parse_color("rgb(0,0,255)").unwrap();
        assert_eq!(c.to_hex(), "#0000FF");
    }

    #[test]
    fn parses_linear_gradient_with_angle() {
        let g = parse_gradient("linear-gradient(135deg, #667eea 0%, #764ba2 100%)").unwrap();
        assert_eq!(g.angle, 135.0);
        assert!(!g.repeating);
        assert_eq!(g.stops.len(), 2);
        assert_eq!(g.stops[0].color.to_hex(), "#667EEA");
        assert_eq!(g.stops[1].offset, 1.0);
    }

    #[test]
    fn parses_gradient_without_positions_or_angle() {
        let g = parse_gradient("linear-gradient(to right, red, rgba(0, 0, 255, 1))").unwrap();
        assert_eq!(g.angle, 90.0);
        assert_eq!(g.stops[0].offset, 0.0);
        assert_eq!(g.stops[1].offset, 1.0);

        let g = parse_gradient("linear-gradient(#fff, #000)").unwrap();
        assert_eq!(g.angle, 180.0);
    }

    #[test]
    fn parses_repeating_pattern_with_pixel_stops() {
        let g = parse_gradient(
            "repeating-linear-gradient(45deg, #f5c400 0px, #f5c400 10px, #1d1d1d 10px, #1d1d1d 20px)",
        )
        .unwrap();
        assert!(g.repeating);
        assert_eq!(g.stops.len(), 4);
        assert_eq!(g.stops[1].offset, 0.5);
        assert_eq!(g.stops[3].offset, 1.0);
    }

    #[test]
    fn rejects_single_stop_gradient() {
        assert!(parse_gradient("linear-gradient(45deg, #fff)").is_err());
        assert!(parse_gradient("radial-gradient(#fff, #000)").is_err());
    }
}
