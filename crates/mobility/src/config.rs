use std::{env, error, fmt, fs, path::Path, str::FromStr, time::Duration};

use model::{geofence::Zone, ride::Pricing};

use crate::geofence;

#[derive(Debug)]
pub enum ConfigError {
    Invalid { name: String, value: String },
    ZoneFile { path: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { name, value } => write!(f, "invalid value {:?} for {}", value, name),
            Self::ZoneFile { path, reason } => {
                write!(f, "can not load zones from {}: {}", path, reason)
            }
        }
    }
}

impl error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub tick_interval: Duration,
    pub pricing: Pricing,
    /// percent
    pub low_battery_threshold: f64,
    /// save the active ride every n ticks, 0 disables periodic saves
    pub persist_every_ticks: u64,
    pub event_buffer: usize,
    pub zones: Vec<Zone>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            pricing: Pricing::default(),
            low_battery_threshold: 20.0,
            persist_every_ticks: 10,
            event_buffer: 64,
            zones: geofence::default_zones(),
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let tick_interval = match var("SCOOTER_TICK_MILLIS") {
            Some(value) => {
                let millis: u64 = parse_value("SCOOTER_TICK_MILLIS", &value)?;
                if millis == 0 {
                    return Err(invalid("SCOOTER_TICK_MILLIS", &value));
                }
                Duration::from_millis(millis)
            }
            None => defaults.tick_interval,
        };
        let unlock_fee = var("SCOOTER_UNLOCK_FEE")
            .map(|value| parse_amount("SCOOTER_UNLOCK_FEE", &value))
            .transpose()?
            .unwrap_or(defaults.pricing.unlock_fee);
        let rate_per_minute = var("SCOOTER_RATE_PER_MINUTE")
            .map(|value| parse_amount("SCOOTER_RATE_PER_MINUTE", &value))
            .transpose()?
            .unwrap_or(defaults.pricing.rate_per_minute);
        let low_battery_threshold = var("SCOOTER_LOW_BATTERY_THRESHOLD")
            .map(|value| parse_amount("SCOOTER_LOW_BATTERY_THRESHOLD", &value))
            .transpose()?
            .unwrap_or(defaults.low_battery_threshold);
        let persist_every_ticks = var("SCOOTER_PERSIST_EVERY_TICKS")
            .map(|value| parse_value("SCOOTER_PERSIST_EVERY_TICKS", &value))
            .transpose()?
            .unwrap_or(defaults.persist_every_ticks);
        let event_buffer = match var("SCOOTER_EVENT_BUFFER") {
            Some(value) => match parse_value::<usize>("SCOOTER_EVENT_BUFFER", &value)? {
                0 => return Err(invalid("SCOOTER_EVENT_BUFFER", &value)),
                size => size,
            },
            None => defaults.event_buffer,
        };
        let zones = match var("SCOOTER_GEOFENCE_FILE") {
            Some(path) => load_zones(path)?,
            None => defaults.zones,
        };

        Ok(Self {
            tick_interval,
            pricing: Pricing::new(unlock_fee, rate_per_minute),
            low_battery_threshold,
            persist_every_ticks,
            event_buffer,
            zones,
        })
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

/// A finite, non-negative number.
fn parse_amount(name: &str, value: &str) -> Result<f64, ConfigError> {
    let amount: f64 = parse_value(name, value)?;
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(invalid(name, value))
    }
}

/// Reads a JSON array of zones.
pub fn load_zones<P: AsRef<Path>>(path: P) -> Result<Vec<Zone>, ConfigError> {
    let path = path.as_ref();
    let zone_file_error = |reason: String| ConfigError::ZoneFile {
        path: path.display().to_string(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|why| zone_file_error(why.to_string()))?;
    let zones: Vec<Zone> =
        serde_json::from_str(&content).map_err(|why| zone_file_error(why.to_string()))?;
    for zone in &zones {
        geofence::validate_zone(zone).map_err(|why| zone_file_error(why.to_string()))?;
    }
    Ok(zones)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use model::geofence::ZoneKind;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<TrackerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        TrackerConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(config(&[]).unwrap(), TrackerConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("SCOOTER_TICK_MILLIS", "250"),
            ("SCOOTER_UNLOCK_FEE", "0.5"),
            ("SCOOTER_RATE_PER_MINUTE", "0.25"),
            ("SCOOTER_LOW_BATTERY_THRESHOLD", "15"),
            ("SCOOTER_PERSIST_EVERY_TICKS", "0"),
            ("SCOOTER_EVENT_BUFFER", " 8 "),
        ])
        .unwrap();
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.pricing, Pricing::new(0.5, 0.25));
        assert_eq!(config.low_battery_threshold, 15.0);
        assert_eq!(config.persist_every_ticks, 0);
        assert_eq!(config.event_buffer, 8);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("SCOOTER_TICK_MILLIS", "0")]).is_err());
        assert!(config(&[("SCOOTER_TICK_MILLIS", "soon")]).is_err());
        assert!(config(&[("SCOOTER_UNLOCK_FEE", "-1")]).is_err());
        assert!(config(&[("SCOOTER_RATE_PER_MINUTE", "NaN")]).is_err());
        assert!(config(&[("SCOOTER_EVENT_BUFFER", "0")]).is_err());
    }

    #[test]
    fn loads_zones_from_file() {
        let path = env::temp_dir().join(format!("zones-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"[{"name": "Pier", "kind": "parking", "latitude": 37.8, "longitude": -122.4, "radiusMeters": 40}]"#,
        )
        .unwrap();
        let config = config(&[("SCOOTER_GEOFENCE_FILE", path.to_str().unwrap())]).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(
            config.zones,
            vec![Zone::new("Pier", ZoneKind::Parking, 37.8, -122.4, 40.0)]
        );
    }

    #[test]
    fn missing_zone_file_is_an_error() {
        let result = config(&[("SCOOTER_GEOFENCE_FILE", "/nonexistent/zones.json")]);
        assert!(matches!(result, Err(ConfigError::ZoneFile { .. })));
    }
}
