//! Magnetic field models
//!
//! - [`UniformField`] - constant field vector everywhere
//! - [`SolenoidField`] - uniform longitudinal field inside a finite solenoid
//!
//! [`FieldSource`] resolves the nominal field an event is tracked with: a
//! supplied field map when there is one, the default solenoid value otherwise.

use nalgebra::{Point3, Vector3};

use crate::common::constants::DEFAULT_BZ_TESLA;
use crate::follower::errors::TrackingError;
use crate::follower::traits::FieldModel;

/// Constant field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField {
    value: Vector3<f64>,
}

impl UniformField {
    /// Longitudinal field of `bz` Tesla
    pub fn new(bz: f64) -> Self {
        Self {
            value: Vector3::new(0.0, 0.0, bz),
        }
    }

    /// Arbitrary constant field vector
    pub fn from_vector(value: Vector3<f64>) -> Self {
        Self { value }
    }
}

impl Default for UniformField {
    fn default() -> Self {
        Self::new(DEFAULT_BZ_TESLA)
    }
}

impl FieldModel for UniformField {
    fn value_at(&self, _point: &Point3<f64>) -> Vector3<f64> {
        self.value
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

/// Ideal solenoid: uniform `bz` inside the coil, no field outside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolenoidField {
    /// Field inside the coil (T)
    pub bz: f64,
    /// Inner coil radius (cm)
    pub radius: f64,
    /// Coil half-length (cm)
    pub half_length: f64,
}

impl SolenoidField {
    /// Create a new solenoid
    pub fn new(bz: f64, radius: f64, half_length: f64) -> Result<Self, TrackingError> {
        if !(radius > 0.0 && half_length > 0.0 && bz.is_finite()) {
            return Err(TrackingError::Configuration {
                description: format!(
                    "solenoid needs positive dimensions and a finite field, \
                     got r = {}, half length = {}, bz = {}",
                    radius, half_length, bz
                ),
            });
        }
        Ok(Self {
            bz,
            radius,
            half_length,
        })
    }
}

impl FieldModel for SolenoidField {
    fn value_at(&self, point: &Point3<f64>) -> Vector3<f64> {
        let inside = point.x.hypot(point.y) <= self.radius && point.z.abs() <= self.half_length;
        if inside {
            Vector3::new(0.0, 0.0, self.bz)
        } else {
            Vector3::zeros()
        }
    }

    fn name(&self) -> &'static str {
        "solenoid"
    }
}

/// Where the nominal field of an event comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldSource {
    /// Read from the supplied field map at the origin
    FieldMap(f64),
    /// No map supplied, default solenoid value
    Default(f64),
}

impl FieldSource {
    /// Resolve the nominal longitudinal field
    ///
    /// With `require_map` set, a missing map is an error instead of a fallback.
    pub fn resolve(map: Option<&dyn FieldModel>, require_map: bool) -> Result<Self, TrackingError> {
        match map {
            Some(model) => {
                let bz = model.bz_at(&Point3::origin());
                if !bz.is_finite() {
                    return Err(TrackingError::MissingField);
                }
                log::debug!("Nominal field from {} map: Bz = {:.4} T", model.name(), bz);
                Ok(FieldSource::FieldMap(bz))
            }
            None if require_map => Err(TrackingError::MissingField),
            None => {
                log::warn!(
                    "No field map supplied, using default solenoid field Bz = {:.2} T",
                    DEFAULT_BZ_TESLA
                );
                Ok(FieldSource::Default(DEFAULT_BZ_TESLA))
            }
        }
    }

    /// Nominal longitudinal field (T)
    pub fn bz(&self) -> f64 {
        match self {
            FieldSource::FieldMap(bz) | FieldSource::Default(bz) => *bz,
        }
    }

    /// Uniform field at the nominal value
    pub fn uniform(&self) -> UniformField {
        UniformField::new(self.bz())
    }
}
