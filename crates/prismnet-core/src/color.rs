use crate::error::ColorError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Height used when a fill color cannot be resolved at all.
pub const DEFAULT_HEIGHT: f64 = 1.0;

/// RGB distance above which the two nearest mapped colors are blended instead
/// of snapping to the nearest one.
const SNAP_DISTANCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn distance(self, other: Rgb) -> f64 {
        let dr = f64::from(self.0) - f64::from(other.0);
        let dg = f64::from(self.1) - f64::from(other.1);
        let db = f64::from(self.2) - f64::from(other.2);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Parses named colors, `#rgb`, `#rrggbb` and `rgb(r, g, b)`.
pub fn parse_color(s: &str) -> Option<Rgb> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = s.to_ascii_lowercase();
    if let Some(args) = lower.strip_prefix("rgb") {
        return parse_rgb_fn(args);
    }
    named_color(&lower)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn parse_rgb_fn(args: &str) -> Option<Rgb> {
    let inner = args.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut channels = inner.split(',').map(|p| p.trim().parse::<u8>().ok());
    let r = channels.next()??;
    let g = channels.next()??;
    let b = channels.next()??;
    if channels.next().is_some() {
        return None;
    }
    Some(Rgb(r, g, b))
}

fn named_color(name: &str) -> Option<Rgb> {
    let rgb = match name {
        "red" => Rgb(255, 0, 0),
        "green" => Rgb(0, 255, 0),
        "blue" => Rgb(0, 0, 255),
        "yellow" => Rgb(255, 255, 0),
        "cyan" => Rgb(0, 255, 255),
        "magenta" => Rgb(255, 0, 255),
        "black" => Rgb(0, 0, 0),
        "white" => Rgb(255, 255, 255),
        "gray" | "grey" => Rgb(128, 128, 128),
        "orange" => Rgb(255, 165, 0),
        "purple" => Rgb(128, 0, 128),
        "brown" => Rgb(165, 42, 42),
        "pink" => Rgb(255, 192, 203),
        _ => return None,
    };
    Some(rgb)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorHeight {
    pub name: String,
    pub rgb: Option<Rgb>,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Nearest,
    Interpolated,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightMatch {
    pub height: f64,
    pub kind: MatchKind,
}

/// Ordered color → height table, validated once and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorHeightMap {
    entries: Vec<ColorHeight>,
}

impl ColorHeightMap {
    pub fn new<S: Into<String>>(
        entries: impl IntoIterator<Item = (S, f64)>,
    ) -> Result<Self, ColorError> {
        let mut out = Vec::new();
        for (name, height) in entries {
            let name = name.into();
            if !(height.is_finite() && height > 0.0) {
                return Err(ColorError::NonPositiveHeight { color: name, height });
            }
            out.push(ColorHeight {
                rgb: parse_color(&name),
                name,
                height,
            });
        }
        if out.is_empty() {
            return Err(ColorError::EmptyMapping);
        }
        Ok(Self { entries: out })
    }

    pub fn entries(&self) -> &[ColorHeight] {
        &self.entries
    }

    pub fn resolve(&self, color: &str) -> HeightMatch {
        let wanted = color.trim();
        if let Some(e) = self
            .entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(wanted))
        {
            return HeightMatch {
                height: e.height,
                kind: MatchKind::Exact,
            };
        }

        let Some(target) = parse_color(wanted) else {
            return HeightMatch {
                height: DEFAULT_HEIGHT,
                kind: MatchKind::Default,
            };
        };

        let mut ranked: Vec<(f64, f64)> = self
            .entries
            .iter()
            .filter_map(|e| e.rgb.map(|rgb| (target.distance(rgb), e.height)))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        match ranked.as_slice() {
            [] => HeightMatch {
                height: DEFAULT_HEIGHT,
                kind: MatchKind::Default,
            },
            [(d1, h1), (d2, h2), ..] if *d1 > SNAP_DISTANCE => {
                let w1 = d2 / (d1 + d2);
                let w2 = d1 / (d1 + d2);
                HeightMatch {
                    height: w1 * h1 + w2 * h2,
                    kind: MatchKind::Interpolated,
                }
            }
            [(_, h), ..] => HeightMatch {
                height: *h,
                kind: MatchKind::Nearest,
            },
        }
    }
}

impl FromStr for ColorHeightMap {
    type Err = ColorError;

    /// Parses `"red:1, blue:2, #00ff00:1.5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pairs = Vec::new();
        for part in split_entries(s).into_iter().map(str::trim).filter(|p| !p.is_empty()) {
            let (name, height) = part
                .rsplit_once(':')
                .ok_or_else(|| ColorError::InvalidMapping(part.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ColorError::InvalidMapping(part.to_string()));
            }
            let height: f64 = height
                .trim()
                .parse()
                .map_err(|_| ColorError::InvalidMapping(part.to_string()))?;
            pairs.push((name.to_string(), height));
        }
        Self::new(pairs)
    }
}

/// Splits on commas that are not inside `rgb(...)`.
fn split_entries(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}
