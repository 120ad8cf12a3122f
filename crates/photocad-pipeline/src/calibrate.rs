//! Scale calibration from two reference points and a known distance.
//!
//! The base unit is the metre: a known distance in any [`LengthUnit`]
//! is normalised to metres before dividing, so the resulting
//! [`Scale`] is always pixels per metre.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::reference::{ReferencePoint, ReferenceSet};
use crate::types::{PipelineError, Point, Scale};

/// Unit of a user-supplied known distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Millimetres.
    #[serde(alias = "mm")]
    Millimeters,
    /// Centimetres.
    #[serde(alias = "cm")]
    Centimeters,
    /// Metres.
    #[default]
    #[serde(alias = "m")]
    Meters,
    /// International inches.
    #[serde(alias = "in")]
    Inches,
    /// International feet.
    #[serde(alias = "ft")]
    Feet,
}

impl LengthUnit {
    /// Metres per one of this unit.
    #[must_use]
    pub const fn meters_per_unit(self) -> f64 {
        match self {
            Self::Millimeters => 0.001,
            Self::Centimeters => 0.01,
            Self::Meters => 1.0,
            Self::Inches => 0.0254,
            Self::Feet => 0.3048,
        }
    }

    /// Convert a distance in this unit to metres.
    #[must_use]
    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    /// Short symbol (`mm`, `cm`, `m`, `in`, `ft`).
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Millimeters => "mm",
            Self::Centimeters => "cm",
            Self::Meters => "m",
            Self::Inches => "in",
            Self::Feet => "ft",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for LengthUnit {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mm" | "millimeters" | "millimetres" => Ok(Self::Millimeters),
            "cm" | "centimeters" | "centimetres" => Ok(Self::Centimeters),
            "m" | "meters" | "metres" => Ok(Self::Meters),
            "in" | "inches" => Ok(Self::Inches),
            "ft" | "feet" => Ok(Self::Feet),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown length unit {other:?} (expected mm, cm, m, in or ft)"
            ))),
        }
    }
}

/// Errors from [`calibrate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    /// Calibration needs exactly two points.
    #[error("calibration needs 2 reference points, found {found}")]
    NotEnoughPoints {
        /// How many points were supplied.
        found: usize,
    },

    /// The known distance was zero, negative or not a number.
    #[error("known distance must be a positive finite number, got {0}")]
    InvalidDistance(f64),
}

/// Compute pixels per metre from the first two `points`.
///
/// Coincident points yield [`Scale::UNCALIBRATED`] with a warning
/// rather than an error.
///
/// # Errors
///
/// [`CalibrationError::NotEnoughPoints`] with fewer than two points;
/// [`CalibrationError::InvalidDistance`] when `known` is not a positive
/// finite number.
pub fn calibrate(
    points: &[ReferencePoint],
    known: f64,
    unit: LengthUnit,
) -> Result<Scale, CalibrationError> {
    let [a, b, rest @ ..] = points else {
        return Err(CalibrationError::NotEnoughPoints {
            found: points.len(),
        });
    };
    if !rest.is_empty() {
        log::debug!("calibrating from the first 2 of {} points", points.len());
    }
    scale_between(a.point, b.point, known, unit)
}

/// Compute pixels per metre from two pixel positions.
///
/// # Errors
///
/// [`CalibrationError::InvalidDistance`] when `known` is not a positive
/// finite number, or is too small or too large to yield a usable scale
/// once converted to metres.
pub fn scale_between(
    a: Point,
    b: Point,
    known: f64,
    unit: LengthUnit,
) -> Result<Scale, CalibrationError> {
    if !known.is_finite() || known <= 0.0 {
        return Err(CalibrationError::InvalidDistance(known));
    }
    let meters = unit.to_meters(known);
    if !meters.is_finite() || meters <= 0.0 {
        return Err(CalibrationError::InvalidDistance(known));
    }
    let pixels = a.distance(b);
    if pixels <= 0.0 {
        log::warn!("calibration points coincide; leaving drawing uncalibrated");
        return Ok(Scale::UNCALIBRATED);
    }
    let scale = Scale::from_pixels_per_meter(pixels / meters);
    if !scale.is_calibrated() {
        return Err(CalibrationError::InvalidDistance(known));
    }
    log::debug!(
        "{pixels:.2}px over {known}{unit} gives {:.3} px/m",
        scale.pixels_per_meter()
    );
    Ok(scale)
}

/// An interactive calibration session.
///
/// Collects at most two points. Adding a third discards the pending
/// pair and starts a new one. A successful [`calibrate`](Self::calibrate)
/// consumes the pending points and replaces the previous scale
/// outright.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibrator {
    pending: ReferenceSet,
    scale: Scale,
}

impl Calibrator {
    /// A fresh, uncalibrated session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a calibration point and return how many are pending.
    pub fn add_point(&mut self, point: Point) -> usize {
        if self.pending.len() >= 2 {
            self.pending.clear();
        }
        self.pending.add(point);
        self.pending.len()
    }

    /// Points waiting to be used.
    #[must_use]
    pub fn pending(&self) -> &[ReferencePoint] {
        self.pending.points()
    }

    /// Compute a new scale from the pending pair.
    ///
    /// On success the pending points are consumed. On failure they are
    /// kept and the previous scale is untouched.
    ///
    /// # Errors
    ///
    /// See [`calibrate`](fn@calibrate).
    pub fn calibrate(&mut self, known: f64, unit: LengthUnit) -> Result<Scale, CalibrationError> {
        let scale = calibrate(self.pending.points(), known, unit)?;
        self.scale = scale;
        self.pending.clear();
        Ok(scale)
    }

    /// The most recent scale, or uncalibrated.
    #[must_use]
    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// Forget pending points and the current scale.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.scale = Scale::UNCALIBRATED;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pair(a: (f64, f64), b: (f64, f64)) -> Vec<ReferencePoint> {
        [Point::new(a.0, a.1), Point::new(b.0, b.1)]
            .into_iter()
            .collect::<ReferenceSet>()
            .points()
            .to_vec()
    }

    #[test]
    fn hundred_pixels_over_ten_centimetres() {
        let points = pair((0.0, 0.0), (100.0, 0.0));
        let scale = calibrate(&points, 0.1, LengthUnit::Meters).unwrap();
        assert!((scale.pixels_per_meter() - 1000.0).abs() < 1e-9);

        // The same distance in another unit gives the same scale.
        let mm = calibrate(&points, 100.0, LengthUnit::Millimeters).unwrap();
        assert!((mm.pixels_per_meter() - 1000.0).abs() < 1e-9);
        let cm = calibrate(&points, 10.0, LengthUnit::Centimeters).unwrap();
        assert!((cm.pixels_per_meter() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn distances_that_vanish_in_metres_are_rejected() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(100.0, 0.0);
        let result = scale_between(a, b, 1e-320, LengthUnit::Millimeters);
        assert_eq!(result, Err(CalibrationError::InvalidDistance(1e-320)));
    }

    #[test]
    fn distances_too_large_for_a_scale_are_rejected() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1e-300, 0.0);
        let result = scale_between(a, b, f64::MAX, LengthUnit::Meters);
        assert_eq!(result, Err(CalibrationError::InvalidDistance(f64::MAX)));
    }

    #[test]
    fn diagonal_distance_is_euclidean() {
        let points = pair((10.0, 10.0), (40.0, 50.0));
        let scale = calibrate(&points, 1.0, LengthUnit::Feet).unwrap();
        assert!((scale.pixels_per_meter() - 50.0 / 0.3048).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_two_points_is_rejected() {
        let one = pair((0.0, 0.0), (1.0, 1.0))[..1].to_vec();
        assert_eq!(
            calibrate(&one, 1.0, LengthUnit::Meters),
            Err(CalibrationError::NotEnoughPoints { found: 1 })
        );
        assert_eq!(
            calibrate(&[], 1.0, LengthUnit::Meters),
            Err(CalibrationError::NotEnoughPoints { found: 0 })
        );
    }

    #[test]
    fn non_positive_distance_is_rejected() {
        let points = pair((0.0, 0.0), (100.0, 0.0));
        for bad in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                calibrate(&points, bad, LengthUnit::Meters),
                Err(CalibrationError::InvalidDistance(_))
            ));
        }
    }

    #[test]
    fn coincident_points_leave_drawing_uncalibrated() {
        let points = pair((5.0, 5.0), (5.0, 5.0));
        let scale = calibrate(&points, 1.0, LengthUnit::Meters).unwrap();
        assert!(!scale.is_calibrated());
    }

    #[test]
    fn session_replaces_previous_scale() {
        let mut session = Calibrator::new();
        session.add_point(Point::new(0.0, 0.0));
        session.add_point(Point::new(100.0, 0.0));
        session.calibrate(0.1, LengthUnit::Meters).unwrap();
        assert!((session.scale().pixels_per_meter() - 1000.0).abs() < 1e-9);
        assert!(session.pending().is_empty());

        session.add_point(Point::new(0.0, 0.0));
        session.add_point(Point::new(0.0, 30.0));
        session.calibrate(1.0, LengthUnit::Meters).unwrap();
        assert!((session.scale().pixels_per_meter() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn third_point_starts_a_new_pair() {
        let mut session = Calibrator::new();
        assert_eq!(session.add_point(Point::new(0.0, 0.0)), 1);
        assert_eq!(session.add_point(Point::new(1.0, 0.0)), 2);
        assert_eq!(session.add_point(Point::new(9.0, 9.0)), 1);
        assert_eq!(session.pending()[0].point, Point::new(9.0, 9.0));
        assert_eq!(session.pending()[0].id, 0);
    }

    #[test]
    fn failed_calibration_keeps_points_and_scale() {
        let mut session = Calibrator::new();
        session.add_point(Point::new(0.0, 0.0));
        session.add_point(Point::new(10.0, 0.0));
        assert!(session.calibrate(-1.0, LengthUnit::Meters).is_err());
        assert_eq!(session.pending().len(), 2);
        assert!(!session.scale().is_calibrated());
    }

    #[test]
    fn units_parse_by_symbol_or_name() {
        assert_eq!("MM".parse::<LengthUnit>().unwrap(), LengthUnit::Millimeters);
        assert_eq!("feet".parse::<LengthUnit>().unwrap(), LengthUnit::Feet);
        assert!(matches!(
            "yards".parse::<LengthUnit>(),
            Err(PipelineError::InvalidConfig(_))
        ));
        let unit: LengthUnit = serde_json::from_str("\"cm\"").unwrap();
        assert_eq!(unit, LengthUnit::Centimeters);
    }
}
