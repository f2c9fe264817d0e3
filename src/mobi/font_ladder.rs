//! Quantization of point sizes onto the seven `<font size>` rungs.
//!
//! Sizes are compared by a perceptual distance from the base size rather
//! than by their difference in points: small steps near the base matter
//! more than large steps far away from it.

use std::collections::HashMap;

use crate::profile::OutputProfile;

/// Perceptual distance of `size` from `base`.
///
/// Negative below the base, positive above it, zero within a tenth of a
/// point. A zero size yields `base` itself.
pub fn relate(size: f64, base: f64) -> f64 {
    if size == 0.0 {
        return base;
    }
    if (size - base).abs() < 0.1 {
        return 0.0;
    }
    let (sign, endpoint) = if size < base { (-1.0, 0.0) } else { (1.0, 36.0) };
    let diff = (base - size).abs() * 3.0 + (36.0 - size) / 100.0;
    let log_base = (base - endpoint).abs();
    let distance = (diff.ln() / log_base.ln()).abs();
    if distance.is_finite() {
        sign * distance
    } else {
        0.0
    }
}

/// One rung of the ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rung {
    number: u8,
    size: f64,
    distance: f64,
}

/// Maps arbitrary point sizes to `<font size>` rungs (1..=7), memoizing
/// lookups for the lifetime of one conversion run.
#[derive(Debug, Clone)]
pub struct FontLadder {
    base: f64,
    rungs: Vec<Rung>,
    cache: HashMap<i64, u8>,
}

impl FontLadder {
    pub fn new(profile: &OutputProfile) -> Self {
        let base = profile.base_font_size;
        let rungs = profile
            .font_rungs()
            .into_iter()
            .map(|(number, size)| Rung {
                number,
                size,
                distance: relate(size, base),
            })
            .collect();
        Self {
            base,
            rungs,
            cache: HashMap::new(),
        }
    }

    /// Rung for `size`, cached.
    pub fn rung(&mut self, size: f64) -> u8 {
        let size = if size.is_finite() { size } else { 0.0 };
        let key = (size * 1000.0).round() as i64;
        if let Some(&rung) = self.cache.get(&key) {
            return rung;
        }
        let rung = self.nearest(size);
        self.cache.insert(key, rung);
        rung
    }

    /// Rung whose distance from the base is closest to that of `size`.
    /// Ties go to the smaller rung.
    pub fn nearest(&self, size: f64) -> u8 {
        let distance = relate(size, self.base);
        self.rungs
            .iter()
            .min_by(|a, b| {
                let da = (distance - a.distance).abs();
                let db = (distance - b.distance).abs();
                da.total_cmp(&db).then(a.size.total_cmp(&b.size))
            })
            .map_or(3, |rung| rung.number)
    }

    /// Representative point size of a rung.
    pub fn size_of(&self, rung: u8) -> Option<f64> {
        self.rungs.iter().find(|r| r.number == rung).map(|r| r.size)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
