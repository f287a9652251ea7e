//! Color parsing and WCAG contrast math.

use cssparser::{ParseError, Parser, ParserInput, Token};

/// An sRGB color with alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    /// Composite this color over an opaque background.
    pub fn over(self, background: Rgba) -> Rgba {
        if self.is_opaque() {
            return self;
        }
        let a = self.a.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| (fg as f32 * a + bg as f32 * (1.0 - a)).round() as u8;
        Rgba::rgb(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
        )
    }

    /// Relative luminance as defined by WCAG 2.x.
    pub fn relative_luminance(&self) -> f64 {
        fn channel(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * channel(self.r) + 0.7152 * channel(self.g) + 0.0722 * channel(self.b)
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Contrast ratio between two opaque colors, from 1.0 to 21.0.
pub fn contrast_ratio(a: Rgba, b: Rgba) -> f64 {
    let la = a.relative_luminance();
    let lb = b.relative_luminance();
    let (light, dark) = if la >= lb { (la, lb) } else { (lb, la) };
    (light + 0.05) / (dark + 0.05)
}

/// Parse a CSS color value. Keywords that depend on context
/// (`currentColor`, `inherit`, system colors) yield `None`.
pub fn parse_color(value: &str) -> Option<Rgba> {
    let mut input = ParserInput::new(value.trim());
    let mut parser = Parser::new(&mut input);
    let color = parse_color_token(&mut parser)?;
    parser.is_exhausted().then_some(color)
}

fn parse_color_token(input: &mut Parser<'_, '_>) -> Option<Rgba> {
    let token = input.next().ok()?.clone();
    match token {
        Token::Ident(name) => named_color(&name.to_ascii_lowercase()),
        Token::IDHash(hash) | Token::Hash(hash) => parse_hex_color(&hash),
        Token::Function(name) => {
            let name = name.to_ascii_lowercase();
            if name != "rgb" && name != "rgba" {
                return None;
            }
            input.parse_nested_block(nested_components).ok().flatten()
        }
        _ => None,
    }
}

fn nested_components<'i>(input: &mut Parser<'i, '_>) -> Result<Option<Rgba>, ParseError<'i, ()>> {
    Ok(parse_components(input))
}

/// `rgb(1, 2, 3)`, `rgb(1 2 3 / 50%)` and `rgba(1, 2, 3, 0.5)`.
fn parse_components(input: &mut Parser<'_, '_>) -> Option<Rgba> {
    let mut values: Vec<f32> = Vec::with_capacity(4);
    while let Ok(token) = input.next() {
        let index = values.len();
        match token {
            Token::Comma | Token::Delim('/') => continue,
            Token::Number { value, .. } => {
                values.push(if index < 3 { value.clamp(0.0, 255.0) } else { value.clamp(0.0, 1.0) })
            }
            Token::Percentage { unit_value, .. } => values.push(if index < 3 {
                (unit_value * 255.0).clamp(0.0, 255.0)
            } else {
                unit_value.clamp(0.0, 1.0)
            }),
            _ => return None,
        }
    }
    match values.as_slice() {
        [r, g, b] => Some(Rgba::rgb(r.round() as u8, g.round() as u8, b.round() as u8)),
        [r, g, b, a] => Some(Rgba {
            r: r.round() as u8,
            g: g.round() as u8,
            b: b.round() as u8,
            a: *a,
        }),
        _ => None,
    }
}

fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
        4 => Some(Rgba {
            a: (digit(3)? * 17) as f32 / 255.0,
            ..Rgba::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)
        }),
        6 => Some(Rgba::rgb(pair(0)?, pair(2)?, pair(4)?)),
        8 => Some(Rgba {
            a: pair(6)? as f32 / 255.0,
            ..Rgba::rgb(pair(0)?, pair(2)?, pair(4)?)
        }),
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Rgba> {
    let color = match name {
        "black" => Rgba::BLACK,
        "white" => Rgba::WHITE,
        "red" => Rgba::rgb(255, 0, 0),
        "green" => Rgba::rgb(0, 128, 0),
        "lime" => Rgba::rgb(0, 255, 0),
        "blue" => Rgba::rgb(0, 0, 255),
        "navy" => Rgba::rgb(0, 0, 128),
        "yellow" => Rgba::rgb(255, 255, 0),
        "orange" => Rgba::rgb(255, 165, 0),
        "purple" => Rgba::rgb(128, 0, 128),
        "maroon" => Rgba::rgb(128, 0, 0),
        "teal" => Rgba::rgb(0, 128, 128),
        "olive" => Rgba::rgb(128, 128, 0),
        "cyan" | "aqua" => Rgba::rgb(0, 255, 255),
        "magenta" | "fuchsia" => Rgba::rgb(255, 0, 255),
        "silver" => Rgba::rgb(192, 192, 192),
        "gray" | "grey" => Rgba::rgb(128, 128, 128),
        "darkgray" | "darkgrey" => Rgba::rgb(169, 169, 169),
        "lightgray" | "lightgrey" => Rgba::rgb(211, 211, 211),
        "transparent" => Rgba {
            a: 0.0,
            ..Rgba::BLACK
        },
        _ => return None,
    };
    Some(color)
}
