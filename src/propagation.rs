use crate::config::ObserverPosition;
use crate::parser::OrbitalRecord;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

// WGS-84
const EARTH_RADIUS_KM: f64 = 6378.137;
const EARTH_ECCENTRICITY_SQ: f64 = 0.006_694_379_990_14;
/// 2000-01-01T12:00:00Z in milliseconds since the Unix epoch.
const J2000_UNIX_MS: i64 = 946_728_000_000;

/// Direction and distance of an object as seen from the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngle {
    /// Degrees, [0, 360).
    pub azimuth: f64,
    /// Degrees, [-90, 90].
    pub elevation: f64,
    /// Kilometers.
    pub range: f64,
}

impl LookAngle {
    /// Placeholder for objects whose position could not be computed; sorts after everything else.
    pub const UNAVAILABLE: LookAngle = LookAngle {
        azimuth: 0.0,
        elevation: -90.0,
        range: f64::INFINITY,
    };

    pub fn is_available(&self) -> bool {
        self.range.is_finite()
    }
}

impl fmt::Display for LookAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_available() {
            write!(
                f,
                "Az: {:.3}, El: {:.3}, Rng: {:.3}",
                self.azimuth, self.elevation, self.range
            )
        } else {
            write!(f, "unavailable")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot propagate {catalog_id}: {reason}")]
pub struct PropagationError {
    pub catalog_id: u32,
    pub reason: String,
}

impl PropagationError {
    pub fn new(catalog_id: u32, reason: impl fmt::Display) -> Self {
        Self {
            catalog_id,
            reason: reason.to_string(),
        }
    }
}

/// Computes where an object is relative to an observer at a given time.
pub trait Propagator {
    fn look_angle(
        &self,
        record: &OrbitalRecord,
        observer: &ObserverPosition,
        at: DateTime<Utc>,
    ) -> Result<LookAngle, PropagationError>;
}

impl<P: Propagator + ?Sized> Propagator for &P {
    fn look_angle(
        &self,
        record: &OrbitalRecord,
        observer: &ObserverPosition,
        at: DateTime<Utc>,
    ) -> Result<LookAngle, PropagationError> {
        (**self).look_angle(record, observer, at)
    }
}

/// SGP4/SDP4 propagation followed by a topocentric transform.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sgp4Propagator;

impl Propagator for Sgp4Propagator {
    fn look_angle(
        &self,
        record: &OrbitalRecord,
        observer: &ObserverPosition,
        at: DateTime<Utc>,
    ) -> Result<LookAngle, PropagationError> {
        let id = record.catalog_id();
        let elements = sgp4::Elements::from_tle(
            Some(record.name().to_string()),
            record.line1().as_bytes(),
            record.line2().as_bytes(),
        )
        .map_err(|e| PropagationError::new(id, e))?;
        let constants =
            sgp4::Constants::from_elements(&elements).map_err(|e| PropagationError::new(id, e))?;
        let minutes = elements
            .datetime_to_minutes_since_epoch(&at.naive_utc())
            .map_err(|e| PropagationError::new(id, e))?;
        let prediction = constants
            .propagate(minutes)
            .map_err(|e| PropagationError::new(id, e))?;

        let look = topocentric(prediction.position, observer, at);
        if !look.range.is_finite() || !look.azimuth.is_finite() || !look.elevation.is_finite() {
            return Err(PropagationError::new(id, "non-finite position"));
        }
        Ok(look)
    }
}

/// Greenwich mean sidereal time in radians.
pub fn gmst(at: DateTime<Utc>) -> f64 {
    let days = (at.timestamp_millis() - J2000_UNIX_MS) as f64 / 86_400_000.0;
    let centuries = days / 36_525.0;
    let degrees = 280.460_618_37 + 360.985_647_366_29 * days + 0.000_387_933 * centuries * centuries
        - centuries * centuries * centuries / 38_710_000.0;
    degrees.rem_euclid(360.0).to_radians()
}

/// Earth-fixed position of the observer in kilometers.
pub fn observer_ecef(observer: &ObserverPosition) -> [f64; 3] {
    let lat = observer.latitude().to_radians();
    let lon = observer.longitude().to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let n = EARTH_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
    let alt_km = observer.altitude() / 1000.0;
    [
        (n + alt_km) * cos_lat * cos_lon,
        (n + alt_km) * cos_lat * sin_lon,
        (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat,
    ]
}

/// Look angle of a TEME position (km) from the observer at `at`.
pub fn topocentric(teme: [f64; 3], observer: &ObserverPosition, at: DateTime<Utc>) -> LookAngle {
    let (sin_t, cos_t) = gmst(at).sin_cos();
    let ecef = [
        cos_t * teme[0] + sin_t * teme[1],
        -sin_t * teme[0] + cos_t * teme[1],
        teme[2],
    ];
    let site = observer_ecef(observer);
    let rho = [ecef[0] - site[0], ecef[1] - site[1], ecef[2] - site[2]];

    let (sin_lat, cos_lat) = observer.latitude().to_radians().sin_cos();
    let (sin_lon, cos_lon) = observer.longitude().to_radians().sin_cos();

    // South-east-zenith frame.
    let south = sin_lat * cos_lon * rho[0] + sin_lat * sin_lon * rho[1] - cos_lat * rho[2];
    let east = -sin_lon * rho[0] + cos_lon * rho[1];
    let zenith = cos_lat * cos_lon * rho[0] + cos_lat * sin_lon * rho[1] + sin_lat * rho[2];

    let range = (south * south + east * east + zenith * zenith).sqrt();
    let elevation = if range > 0.0 {
        (zenith / range).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        90.0
    };
    let azimuth = east.atan2(-south).to_degrees().rem_euclid(360.0);

    LookAngle {
        azimuth,
        elevation,
        range,
    }
}
