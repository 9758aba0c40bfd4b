//! Threshold classification of batch dispersion.
//!
//! The thresholds are empirical values tuned on the exhibit hardware. Each
//! bucket's lower bound is inclusive: a dispersion exactly on a threshold falls
//! into the higher bucket.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::data::round2;

/// Below this σ (cm) a surface is flat.
pub const SHAPE_FLAT_BELOW: f64 = 0.5;
/// Below this σ (cm) a surface is curved, otherwise irregular.
pub const SHAPE_CURVED_BELOW: f64 = 2.0;
/// Below this σ (cm) a surface is reflective.
pub const MATERIAL_REFLECTIVE_BELOW: f64 = 1.5;
/// Below this σ (cm) a surface has medium absorption, otherwise high.
pub const MATERIAL_MEDIUM_BELOW: f64 = 3.0;
/// Split point of the two-bucket absorption variant.
pub const ABSORBING_FROM: f64 = 2.0;

/// Lowest accuracy score ever reported.
pub const ACCURACY_FLOOR: f64 = 80.0;
/// Accuracy penalty per degree between object and ambient temperature.
pub const ACCURACY_TEMP_WEIGHT: f64 = 0.8;
/// Accuracy penalty per centimeter of dispersion.
pub const ACCURACY_SPREAD_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ShapeLabel {
    Flat,
    Curved,
    Irregular,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MaterialLabel {
    Reflective,
    #[serde(rename = "Medium absorption")]
    MediumAbsorption,
    #[serde(rename = "High absorption")]
    HighAbsorption,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AbsorptionLabel {
    Reflective,
    Absorbing,
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeLabel::Flat => "Flat",
            ShapeLabel::Curved => "Curved",
            ShapeLabel::Irregular => "Irregular",
        })
    }
}

impl fmt::Display for MaterialLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MaterialLabel::Reflective => "Reflective",
            MaterialLabel::MediumAbsorption => "Medium absorption",
            MaterialLabel::HighAbsorption => "High absorption",
        })
    }
}

impl fmt::Display for AbsorptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbsorptionLabel::Reflective => "Reflective",
            AbsorptionLabel::Absorbing => "Absorbing",
        })
    }
}

/// Ordered dispersion thresholds, in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationThresholds {
    pub shape_flat_below: f64,
    pub shape_curved_below: f64,
    pub material_reflective_below: f64,
    pub material_medium_below: f64,
    pub absorbing_from: f64,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            shape_flat_below: SHAPE_FLAT_BELOW,
            shape_curved_below: SHAPE_CURVED_BELOW,
            material_reflective_below: MATERIAL_REFLECTIVE_BELOW,
            material_medium_below: MATERIAL_MEDIUM_BELOW,
            absorbing_from: ABSORBING_FROM,
        }
    }
}

impl ClassificationThresholds {
    pub fn shape(&self, stddev_cm: f64) -> ShapeLabel {
        if stddev_cm < self.shape_flat_below {
            ShapeLabel::Flat
        } else if stddev_cm < self.shape_curved_below {
            ShapeLabel::Curved
        } else {
            ShapeLabel::Irregular
        }
    }

    pub fn material(&self, stddev_cm: f64) -> MaterialLabel {
        if stddev_cm < self.material_reflective_below {
            MaterialLabel::Reflective
        } else if stddev_cm < self.material_medium_below {
            MaterialLabel::MediumAbsorption
        } else {
            MaterialLabel::HighAbsorption
        }
    }

    pub fn absorption(&self, stddev_cm: f64) -> AbsorptionLabel {
        if stddev_cm < self.absorbing_from {
            AbsorptionLabel::Reflective
        } else {
            AbsorptionLabel::Absorbing
        }
    }

    /// Check that each pair of thresholds is ordered and non-negative.
    pub fn is_ordered(&self) -> bool {
        0.0 <= self.shape_flat_below
            && self.shape_flat_below <= self.shape_curved_below
            && 0.0 <= self.material_reflective_below
            && self.material_reflective_below <= self.material_medium_below
            && 0.0 <= self.absorbing_from
    }
}

/// Displayed confidence: `100 - (0.8 * |ΔT| + 2 * σ)`, never below 80.
pub fn accuracy_score(temp_delta_c: f64, stddev_cm: f64) -> f64 {
    let penalty = ACCURACY_TEMP_WEIGHT * temp_delta_c.abs() + ACCURACY_SPREAD_WEIGHT * stddev_cm;
    round2((100.0 - penalty).max(ACCURACY_FLOOR))
}
