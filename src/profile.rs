//! Output device profile.
//!
//! A profile describes the reading device the markup is produced for: its
//! base font size, the font size table behind the seven `<font size>` rungs,
//! the reference screen and its resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Keyword and rung number paired with each entry of the font size table.
const FONT_SIZES: [(Option<&str>, Option<u8>); 8] = [
    (Some("xx-small"), Some(1)),
    (Some("x-small"), None),
    (Some("small"), Some(2)),
    (Some("medium"), Some(3)),
    (Some("large"), Some(4)),
    (Some("x-large"), Some(5)),
    (Some("xx-large"), Some(6)),
    (None, Some(7)),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputProfile {
    pub name: String,
    /// Base font size in points.
    #[serde(alias = "fbase")]
    pub base_font_size: f64,
    /// Font size table in points, smallest first.
    #[serde(alias = "fsizes")]
    pub font_sizes: Vec<f64>,
    /// Reference screen width in device pixels.
    pub screen_width: u32,
    /// Reference screen height in device pixels.
    pub screen_height: u32,
    pub dpi: f64,
    /// Indentation emulated by each nested `<blockquote>`, in ems.
    #[serde(alias = "mobi_ems_per_blockquote")]
    pub ems_per_blockquote: f64,
}

impl Default for OutputProfile {
    fn default() -> Self {
        Self {
            name: "mobipocket".to_string(),
            base_font_size: 12.0,
            font_sizes: vec![5.0, 7.0, 9.0, 12.0, 13.5, 17.0, 20.0, 22.0, 24.0],
            screen_width: 1600,
            screen_height: 1200,
            dpi: 100.0,
            ems_per_blockquote: 1.0,
        }
    }
}

impl OutputProfile {
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Reject profiles the converter cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.font_sizes.len() < FONT_SIZES.len() {
            return Err(Error::InvalidProfile(format!(
                "expected at least {} font sizes, got {}",
                FONT_SIZES.len(),
                self.font_sizes.len()
            )));
        }
        for (field, value) in [
            ("base_font_size", self.base_font_size),
            ("dpi", self.dpi),
            ("ems_per_blockquote", self.ems_per_blockquote),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidProfile(format!(
                    "{field} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Size in points for a CSS absolute-size keyword such as `large`.
    pub fn keyword_font_size(&self, keyword: &str) -> Option<f64> {
        FONT_SIZES
            .iter()
            .zip(&self.font_sizes)
            .find(|((name, _), _)| *name == Some(keyword))
            .map(|(_, &size)| size)
    }

    /// The `<font size>` rungs as `(rung, size in points)`.
    pub fn font_rungs(&self) -> Vec<(u8, f64)> {
        FONT_SIZES
            .iter()
            .zip(&self.font_sizes)
            .filter_map(|((_, rung), &size)| rung.map(|r| (r, size)))
            .collect()
    }

    /// Points per device pixel.
    pub fn pt_per_px(&self) -> f64 {
        72.0 / self.dpi
    }

    pub fn width_pts(&self) -> f64 {
        self.screen_width as f64 * self.pt_per_px()
    }

    pub fn height_pts(&self) -> f64 {
        self.screen_height as f64 * self.pt_per_px()
    }
}
