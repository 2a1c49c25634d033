//! Sexagesimal (degrees-minutes-seconds) coordinate parsing
//!
//! Strip locations are stored as DMS text such as `18°47'46.1"N`.
//!
//! ```text
//! dms     := degrees DEG minutes MIN seconds SEC hemi
//! degrees := DIGIT+
//! minutes := DIGIT+                 (< 60)
//! seconds := DIGIT+ ("." DIGIT+)?   (< 60)
//! DEG     := "°" | "º"
//! MIN     := "'" | "′"
//! SEC     := "\"" | "″"
//! hemi    := "N" | "S" | "E" | "W"
//! ```
//!
//! Surrounding whitespace is ignored; nothing else is.

use crate::{QualityError, Result};
use serde::{Deserialize, Serialize};

const DEGREE_MARKS: &[char] = &['°', 'º'];
const MINUTE_MARKS: &[char] = &['\'', '′'];
const SECOND_MARKS: &[char] = &['"', '″'];

/// Thousandths of an arcsecond per degree
const MILLIARCSEC_PER_DEGREE: f64 = 3_600_000.0;

/// Which axis a DMS string describes, decided by its hemisphere letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Largest magnitude allowed on this axis
    pub fn max_degrees(&self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

/// A point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Parse a DMS string into signed decimal degrees.
///
/// `S` and `W` hemispheres yield non-positive values.
pub fn parse_dms(text: &str) -> Result<f64> {
    parse_angle(text).map(|(value, _)| value)
}

/// Parse a latitude/longitude DMS pair.
///
/// The latitude must carry `N`/`S` and the longitude `E`/`W`.
pub fn parse_point(latitude: &str, longitude: &str) -> Result<GeoPoint> {
    let (lat, lat_axis) = parse_angle(latitude)?;
    if lat_axis != Axis::Latitude {
        return Err(malformed(latitude, "latitude must use hemisphere N or S"));
    }

    let (lon, lon_axis) = parse_angle(longitude)?;
    if lon_axis != Axis::Longitude {
        return Err(malformed(longitude, "longitude must use hemisphere E or W"));
    }

    Ok(GeoPoint::new(lat, lon))
}

/// Format decimal degrees as DMS text with seconds to three decimals.
///
/// `value` must be finite.
pub fn format_dms(value: f64, axis: Axis) -> String {
    let hemisphere = match (axis, value < 0.0) {
        (Axis::Latitude, false) => 'N',
        (Axis::Latitude, true) => 'S',
        (Axis::Longitude, false) => 'E',
        (Axis::Longitude, true) => 'W',
    };

    // Integer arithmetic keeps rounding from producing 60 seconds
    let total = (value.abs() * MILLIARCSEC_PER_DEGREE).round() as u64;
    let degrees = total / 3_600_000;
    let minutes = (total / 60_000) % 60;
    let millis = total % 60_000;

    format!(
        "{}°{}'{}.{:03}\"{}",
        degrees,
        minutes,
        millis / 1000,
        millis % 1000,
        hemisphere
    )
}

fn malformed(text: &str, reason: &str) -> QualityError {
    QualityError::MalformedCoordinate {
        text: text.to_string(),
        reason: reason.to_string(),
    }
}

/// Split off the leading ASCII digits
fn take_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Strip one leading marker character, if it is one of `marks`
fn take_mark<'a>(s: &'a str, marks: &[char]) -> Option<&'a str> {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if marks.contains(&c) => Some(chars.as_str()),
        _ => None,
    }
}

fn parse_angle(text: &str) -> Result<(f64, Axis)> {
    let s = text.trim();

    let (degrees, s) = take_digits(s);
    if degrees.is_empty() {
        return Err(malformed(text, "expected degrees"));
    }
    let s = take_mark(s, DEGREE_MARKS).ok_or_else(|| malformed(text, "expected degree sign"))?;

    let (minutes, s) = take_digits(s);
    if minutes.is_empty() {
        return Err(malformed(text, "expected minutes"));
    }
    let s = take_mark(s, MINUTE_MARKS).ok_or_else(|| malformed(text, "expected minute mark"))?;

    let (whole_seconds, s) = take_digits(s);
    if whole_seconds.is_empty() {
        return Err(malformed(text, "expected seconds"));
    }
    let (fraction, s) = match s.strip_prefix('.') {
        Some(rest) => {
            let (fraction, rest) = take_digits(rest);
            if fraction.is_empty() {
                return Err(malformed(text, "expected digits after decimal point"));
            }
            (fraction, rest)
        }
        None => ("", s),
    };
    let s = take_mark(s, SECOND_MARKS).ok_or_else(|| malformed(text, "expected second mark"))?;

    let mut rest = s.chars();
    let (sign, axis) = match rest.next() {
        Some('N') => (1.0, Axis::Latitude),
        Some('S') => (-1.0, Axis::Latitude),
        Some('E') => (1.0, Axis::Longitude),
        Some('W') => (-1.0, Axis::Longitude),
        _ => return Err(malformed(text, "expected hemisphere N, S, E or W")),
    };
    if !rest.as_str().is_empty() {
        return Err(malformed(text, "unexpected trailing characters"));
    }

    let degrees: f64 = degrees
        .parse()
        .map_err(|_| malformed(text, "unreadable degrees"))?;
    let minutes: f64 = minutes
        .parse()
        .map_err(|_| malformed(text, "unreadable minutes"))?;
    let seconds: f64 = if fraction.is_empty() {
        whole_seconds.parse()
    } else {
        format!("{}.{}", whole_seconds, fraction).parse()
    }
    .map_err(|_| malformed(text, "unreadable seconds"))?;

    if minutes >= 60.0 {
        return Err(malformed(text, "minutes must be below 60"));
    }
    if seconds >= 60.0 {
        return Err(malformed(text, "seconds must be below 60"));
    }

    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    if magnitude > axis.max_degrees() {
        return Err(malformed(text, "angle exceeds the range of its axis"));
    }

    Ok((sign * magnitude, axis))
}
