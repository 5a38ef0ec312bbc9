//! RGBA colors, the named palette, and color-string parsing.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::coords::UnitInterval;
use crate::error::{Error, Result};

/// An 8-bit-per-channel RGBA color.
///
/// Opacity is stored quantized in the alpha channel; it is set from floats
/// clamped through [`UnitInterval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (quantized opacity).
    pub a: u8,
}

/// Fully opaque black, the default color of every geometry.
pub const DEFAULT_COLOR: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };

/// Fully opaque white.
pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };

impl Rgba {
    /// Builds an opaque color from its three channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Builds a color with a float opacity, quantized into the alpha channel.
    pub fn with_opacity(r: u8, g: u8, b: u8, opacity: f32) -> Self {
        Self { r, g, b, a: quantize_opacity(UnitInterval::new(opacity)) }
    }

    /// The alpha channel as a float in [0, 1].
    pub fn opacity(&self) -> f32 {
        f32::from(self.a) / 255.0
    }

    /// Replaces the alpha channel with a quantized float opacity.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.a = quantize_opacity(UnitInterval::new(opacity));
    }

    /// Multiplies the RGB channels by `1 - clamp(darkness, 0, 1)`.
    pub fn darken_by(&mut self, darkness: f32) {
        let factor = 1.0 - UnitInterval::new(darkness).value();
        self.r = (f32::from(self.r) * factor) as u8;
        self.g = (f32::from(self.g) * factor) as u8;
        self.b = (f32::from(self.b) * factor) as u8;
    }

    /// Parses a color string: either a palette name (`"red5"`) or an
    /// `"RGBA(r, g, b[, a])"` / `"(r, g, b[, a])"` literal with integer
    /// channels 0-255 and an optional float alpha. A missing alpha takes
    /// `opacity`.
    pub fn from_string(string: &str, opacity: f32) -> Result<Self> {
        if let Some(mut color) = palette_color(string) {
            color.set_opacity(opacity);
            return Ok(color);
        }

        let invalid = || Error::InvalidAttribute {
            name: "color".to_string(),
            value: string.to_string(),
        };
        let captures = rgba_pattern().captures(string).ok_or_else(invalid)?;

        let mut channels = [0u8; 3];
        for (slot, group) in channels.iter_mut().zip(1..=3) {
            let digits = captures.get(group).ok_or_else(invalid)?.as_str();
            *slot = digits.parse::<u8>().map_err(|_| invalid())?;
        }
        let [r, g, b] = channels;

        let opacity = match captures.get(4) {
            Some(alpha) => alpha.as_str().parse::<f32>().map_err(|_| invalid())?,
            None => opacity,
        };
        Ok(Self::with_opacity(r, g, b, opacity))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.r, self.g, self.b, self.opacity())
    }
}

fn quantize_opacity(opacity: UnitInterval) -> u8 {
    (opacity.value() * 255.0) as u8
}

fn rgba_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:RGBA)*\(([0-9]+),\s*([0-9]+),\s*([0-9]+)(?:,\s*([0-9]+(?:\.[0-9]+)?))?\)$")
            .expect("color pattern is well-formed")
    })
}

/// The named palette: `{hue}{0..9}` with 0 the lightest shade.
const PALETTE: &[(&str, (u8, u8, u8))] = &[
    ("gray0", (248, 249, 250)),
    ("gray1", (241, 243, 245)),
    ("gray2", (233, 236, 239)),
    ("gray3", (222, 226, 230)),
    ("gray4", (206, 212, 218)),
    ("gray5", (173, 181, 189)),
    ("gray6", (134, 142, 150)),
    ("gray7", (73, 80, 87)),
    ("gray8", (52, 58, 64)),
    ("gray9", (33, 37, 41)),
    ("red0", (255, 245, 245)),
    ("red1", (255, 227, 227)),
    ("red2", (255, 201, 201)),
    ("red3", (255, 168, 168)),
    ("red4", (255, 135, 135)),
    ("red5", (255, 107, 107)),
    ("red6", (250, 82, 82)),
    ("red7", (240, 62, 62)),
    ("red8", (224, 49, 49)),
    ("red9", (201, 42, 42)),
    ("pink0", (255, 240, 246)),
    ("pink1", (255, 222, 235)),
    ("pink2", (252, 194, 215)),
    ("pink3", (250, 162, 193)),
    ("pink4", (247, 131, 172)),
    ("pink5", (240, 101, 149)),
    ("pink6", (230, 73, 128)),
    ("pink7", (214, 51, 108)),
    ("pink8", (194, 37, 92)),
    ("pink9", (166, 30, 77)),
    ("grape0", (248, 240, 252)),
    ("grape1", (243, 217, 250)),
    ("grape2", (238, 190, 250)),
    ("grape3", (229, 153, 247)),
    ("grape4", (218, 119, 242)),
    ("grape5", (204, 93, 232)),
    ("grape6", (190, 75, 219)),
    ("grape7", (174, 62, 201)),
    ("grape8", (156, 54, 181)),
    ("grape9", (134, 46, 156)),
    ("violet0", (243, 240, 255)),
    ("violet1", (229, 219, 255)),
    ("violet2", (208, 191, 255)),
    ("violet3", (177, 151, 252)),
    ("violet4", (151, 117, 250)),
    ("violet5", (132, 94, 247)),
    ("violet6", (121, 80, 242)),
    ("violet7", (112, 72, 232)),
    ("violet8", (103, 65, 217)),
    ("violet9", (95, 61, 196)),
    ("indigo0", (237, 242, 255)),
    ("indigo1", (219, 228, 255)),
    ("indigo2", (186, 200, 255)),
    ("indigo3", (145, 167, 255)),
    ("indigo4", (116, 143, 252)),
    ("indigo5", (92, 124, 250)),
    ("indigo6", (76, 110, 245)),
    ("indigo7", (66, 99, 235)),
    ("indigo8", (59, 91, 219)),
    ("indigo9", (54, 79, 199)),
    ("blue0", (231, 245, 255)),
    ("blue1", (208, 235, 255)),
    ("blue2", (165, 216, 255)),
    ("blue3", (116, 192, 252)),
    ("blue4", (77, 171, 247)),
    ("blue5", (51, 154, 240)),
    ("blue6", (34, 139, 230)),
    ("blue7", (28, 126, 214)),
    ("blue8", (25, 113, 194)),
    ("blue9", (24, 100, 171)),
    ("cyan0", (227, 250, 252)),
    ("cyan1", (197, 246, 250)),
    ("cyan2", (153, 233, 242)),
    ("cyan3", (102, 217, 232)),
    ("cyan4", (59, 201, 219)),
    ("cyan5", (34, 184, 207)),
    ("cyan6", (21, 170, 191)),
    ("cyan7", (16, 152, 173)),
    ("cyan8", (12, 133, 153)),
    ("cyan9", (11, 114, 133)),
    ("teal0", (230, 252, 245)),
    ("teal1", (195, 250, 232)),
    ("teal2", (150, 242, 215)),
    ("teal3", (99, 230, 190)),
    ("teal4", (56, 217, 169)),
    ("teal5", (32, 201, 151)),
    ("teal6", (18, 184, 134)),
    ("teal7", (12, 166, 120)),
    ("teal8", (9, 146, 104)),
    ("teal9", (8, 127, 91)),
    ("green0", (235, 251, 238)),
    ("green1", (211, 249, 216)),
    ("green2", (178, 242, 187)),
    ("green3", (140, 233, 154)),
    ("green4", (105, 219, 124)),
    ("green5", (81, 207, 102)),
    ("green6", (64, 192, 87)),
    ("green7", (55, 178, 77)),
    ("green8", (47, 158, 68)),
    ("green9", (43, 138, 62)),
    ("lime0", (244, 252, 227)),
    ("lime1", (233, 250, 200)),
    ("lime2", (216, 245, 162)),
    ("lime3", (192, 235, 117)),
    ("lime4", (169, 227, 75)),
    ("lime5", (148, 216, 45)),
    ("lime6", (130, 201, 30)),
    ("lime7", (116, 184, 22)),
    ("lime8", (102, 168, 15)),
    ("lime9", (92, 148, 13)),
    ("yellow0", (255, 249, 219)),
    ("yellow1", (255, 243, 191)),
    ("yellow2", (255, 236, 153)),
    ("yellow3", (255, 224, 102)),
    ("yellow4", (255, 212, 59)),
    ("yellow5", (252, 196, 25)),
    ("yellow6", (250, 176, 5)),
    ("yellow7", (245, 159, 0)),
    ("yellow8", (240, 140, 0)),
    ("yellow9", (230, 119, 0)),
    ("orange0", (255, 244, 230)),
    ("orange1", (255, 232, 204)),
    ("orange2", (255, 216, 168)),
    ("orange3", (255, 192, 120)),
    ("orange4", (255, 169, 77)),
    ("orange5", (255, 146, 43)),
    ("orange6", (253, 126, 20)),
    ("orange7", (247, 103, 7)),
    ("orange8", (232, 89, 12)),
    ("orange9", (217, 72, 15)),
];

fn palette_color(name: &str) -> Option<Rgba> {
    PALETTE
        .iter()
        .find(|(entry_name, _)| *entry_name == name)
        .map(|&(_, (r, g, b))| Rgba::new(r, g, b))
}
