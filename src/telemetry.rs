use serde::{Deserialize, Serialize};

use crate::constants::{FIRE_ALERT_CLASS, FIRE_NORMAL_TEXT};
use crate::display::{ElementId, Surface};
use crate::map::LatLng;

// Telemetry snapshot as served by /api/drone_telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drone_id: Option<String>,
    pub location: Location,
    pub movement: Movement,
    pub battery: Battery,
    pub fire_detection: FireDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub percentage: f64,
    pub voltage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireDetection {
    pub detected: bool,
    pub confidence: f64,
    #[serde(default)]
    pub temperature: f64,
}

impl TelemetryReading {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.location.lat, self.location.lon)
    }
}

/// Fixed-point rendering with ties rounded away from zero.
///
/// `format!("{:.N}")` rounds exact ties to even, which disagrees with the
/// browser's `toFixed` on values such as `2.5` or `50.25`.
pub fn to_fixed(value: f64, digits: usize) -> String {
    const EXTRA_DIGITS: usize = 24;
    if !value.is_finite() {
        return value.to_string();
    }

    let wide = format!("{:.*}", digits + EXTRA_DIGITS, value.abs());
    let (kept, tail) = wide.split_at(wide.len() - EXTRA_DIGITS);
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');
    if !is_tie {
        return format!("{:.*}", digits, value);
    }

    // `kept` holds the truncated digits (with a trailing '.' when digits == 0)
    let mut bytes = kept.trim_end_matches('.').as_bytes().to_vec();
    let mut i = bytes.len();
    loop {
        if i == 0 {
            bytes.insert(0, b'1');
            break;
        }
        i -= 1;
        match bytes[i] {
            b'.' => continue,
            b'9' => bytes[i] = b'0',
            d => {
                bytes[i] = d + 1;
                break;
            }
        }
    }

    let magnitude = String::from_utf8(bytes).unwrap_or_default();
    if value.is_sign_negative() {
        format!("-{}", magnitude)
    } else {
        magnitude
    }
}

pub fn format_location(lat: f64, lon: f64) -> String {
    format!("{}° N, {}° E", to_fixed(lat, 4), to_fixed(lon, 4))
}

pub fn format_altitude(altitude: f64) -> String {
    format!("{} m", to_fixed(altitude, 1))
}

pub fn format_speed(speed: f64) -> String {
    format!("{} m/s", to_fixed(speed, 1))
}

pub fn format_battery(percentage: f64, voltage: f64) -> String {
    format!("{}% ({}V)", to_fixed(percentage, 0), to_fixed(voltage, 1))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireStatus {
    pub text: String,
    /// Visual state class; empty when there is no alert.
    pub class: String,
}

pub fn format_fire_status(fire: &FireDetection) -> FireStatus {
    if fire.detected {
        FireStatus {
            text: format!(
                "Ανίχνευση Πυρκαγιάς! (Εμπιστοσύνη: {}%)",
                to_fixed(fire.confidence * 100.0, 0)
            ),
            class: FIRE_ALERT_CLASS.to_string(),
        }
    } else {
        FireStatus {
            text: FIRE_NORMAL_TEXT.to_string(),
            class: String::new(),
        }
    }
}

/// Every display string derived from one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPanel {
    pub location: String,
    pub altitude: String,
    pub speed: String,
    pub battery: String,
    pub fire_status: FireStatus,
}

impl From<&TelemetryReading> for TelemetryPanel {
    fn from(reading: &TelemetryReading) -> Self {
        Self {
            location: format_location(reading.location.lat, reading.location.lon),
            altitude: format_altitude(reading.location.altitude),
            speed: format_speed(reading.movement.speed),
            battery: format_battery(reading.battery.percentage, reading.battery.voltage),
            fire_status: format_fire_status(&reading.fire_detection),
        }
    }
}

impl TelemetryPanel {
    /// Writes the panel into whichever targets the surface has.
    pub fn write_to<S: Surface>(&self, surface: &mut S) {
        surface.set_text(ElementId::Location, &self.location);
        surface.set_text(ElementId::Altitude, &self.altitude);
        surface.set_text(ElementId::Speed, &self.speed);
        surface.set_text(ElementId::Battery, &self.battery);
        surface.set_text(ElementId::FireStatus, &self.fire_status.text);
        surface.set_class(ElementId::FireStatus, &self.fire_status.class);
    }
}
