//! Hour-keyed price snapshot produced by one refresh cycle
//!
//! Prices live in two dense `[Option<f64>; 24]` arrays so every hour key is
//! present in each snapshot whether or not the API delivered data for it.
//! Externally the snapshot is a flat map: `today_00`..`today_23`,
//! `tomorrow_00`..`tomorrow_23`, `current_price`, `last_update_time` and
//! `last_update_success`.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Number of hour keys per day
pub const HOURS_IN_DAY: usize = 24;

/// Unit of every price value
pub const PRICE_UNIT: &str = "ct/kWh";

pub const CURRENT_PRICE_KEY: &str = "current_price";
pub const LAST_UPDATE_TIME_KEY: &str = "last_update_time";
pub const LAST_UPDATE_SUCCESS_KEY: &str = "last_update_success";

/// Local calendar day a price belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Day {
    Today,
    Tomorrow,
}

impl Day {
    pub const ALL: [Day; 2] = [Day::Today, Day::Tomorrow];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
        }
    }
}

/// A single observable value of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    Hour(Day, u32),
    CurrentPrice,
    LastUpdateTime,
    LastUpdateSuccess,
}

impl SnapshotKey {
    /// Hour key, `None` when the hour is outside 0..24
    pub fn hour(day: Day, hour: u32) -> Option<Self> {
        ((hour as usize) < HOURS_IN_DAY).then_some(Self::Hour(day, hour))
    }

    /// Every key, in display order: current price, today, tomorrow, diagnostics
    pub fn all() -> impl Iterator<Item = SnapshotKey> {
        std::iter::once(Self::CurrentPrice)
            .chain(Self::hour_keys())
            .chain([Self::LastUpdateTime, Self::LastUpdateSuccess])
    }

    /// The 48 hour keys
    pub fn hour_keys() -> impl Iterator<Item = SnapshotKey> {
        Day::ALL
            .into_iter()
            .flat_map(|day| (0..HOURS_IN_DAY as u32).map(move |h| Self::Hour(day, h)))
    }

    /// Whether the value is a price in ct/kWh
    pub fn is_price(self) -> bool {
        matches!(self, Self::Hour(..) | Self::CurrentPrice)
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hour(day, hour) => write!(f, "{}_{:02}", day.prefix(), hour),
            Self::CurrentPrice => f.write_str(CURRENT_PRICE_KEY),
            Self::LastUpdateTime => f.write_str(LAST_UPDATE_TIME_KEY),
            Self::LastUpdateSuccess => f.write_str(LAST_UPDATE_SUCCESS_KEY),
        }
    }
}

/// Error returned for keys outside the snapshot schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey(pub String);

impl fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown snapshot key: {}", self.0)
    }
}

impl std::error::Error for UnknownKey {}

impl FromStr for SnapshotKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CURRENT_PRICE_KEY => return Ok(Self::CurrentPrice),
            LAST_UPDATE_TIME_KEY => return Ok(Self::LastUpdateTime),
            LAST_UPDATE_SUCCESS_KEY => return Ok(Self::LastUpdateSuccess),
            _ => {}
        }
        let parsed = s.rsplit_once('_').and_then(|(prefix, hour)| {
            let day = Day::ALL.into_iter().find(|d| d.prefix() == prefix)?;
            // exactly two digits, as rendered
            if hour.len() != 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Self::hour(day, hour.parse().ok()?)
        });
        parsed.ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Complete hour-keyed price map of one refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    today: [Option<f64>; HOURS_IN_DAY],
    tomorrow: [Option<f64>; HOURS_IN_DAY],
    current_price: Option<f64>,
    last_update_time: DateTime<FixedOffset>,
    last_update_success: bool,
}

impl PriceSnapshot {
    /// All hours null, stamped with the local update time
    pub fn empty(last_update_time: DateTime<FixedOffset>) -> Self {
        Self {
            today: [None; HOURS_IN_DAY],
            tomorrow: [None; HOURS_IN_DAY],
            current_price: None,
            last_update_time,
            last_update_success: true,
        }
    }

    fn day(&self, day: Day) -> &[Option<f64>; HOURS_IN_DAY] {
        match day {
            Day::Today => &self.today,
            Day::Tomorrow => &self.tomorrow,
        }
    }

    /// Overwrite one hour; hours outside 0..24 are ignored
    pub fn set_hour(&mut self, day: Day, hour: u32, value: Option<f64>) {
        let slots = match day {
            Day::Today => &mut self.today,
            Day::Tomorrow => &mut self.tomorrow,
        };
        if let Some(slot) = slots.get_mut(hour as usize) {
            *slot = value;
        }
    }

    pub fn hour(&self, day: Day, hour: u32) -> Option<f64> {
        self.day(day).get(hour as usize).copied().flatten()
    }

    /// Hourly values of one day, index = local hour
    pub fn hours(&self, day: Day) -> &[Option<f64>] {
        self.day(day)
    }

    /// Take the current price from today's value at `hour`
    pub fn select_current_hour(&mut self, hour: u32) {
        self.current_price = self.hour(Day::Today, hour);
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }

    pub fn last_update_time(&self) -> DateTime<FixedOffset> {
        self.last_update_time
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success
    }

    /// Same prices, flagged as left over from a failed refresh
    pub fn marked_failed(&self) -> Self {
        Self {
            last_update_success: false,
            ..self.clone()
        }
    }

    /// Number of hours (both days) that carry a price
    pub fn filled_hours(&self) -> usize {
        self.today
            .iter()
            .chain(self.tomorrow.iter())
            .filter(|v| v.is_some())
            .count()
    }

    /// Value of one key as JSON (`null` for missing prices)
    pub fn value(&self, key: SnapshotKey) -> Value {
        match key {
            SnapshotKey::Hour(day, hour) => price_value(self.hour(day, hour)),
            SnapshotKey::CurrentPrice => price_value(self.current_price),
            SnapshotKey::LastUpdateTime => Value::String(
                self.last_update_time
                    .to_rfc3339_opts(SecondsFormat::Micros, false),
            ),
            SnapshotKey::LastUpdateSuccess => Value::Bool(self.last_update_success),
        }
    }

    /// Look up a value by its string key
    pub fn get(&self, key: &str) -> Option<Value> {
        key.parse::<SnapshotKey>().ok().map(|k| self.value(k))
    }

    /// Flat key/value map with every key of the schema
    pub fn to_map(&self) -> Map<String, Value> {
        SnapshotKey::all()
            .map(|k| (k.to_string(), self.value(k)))
            .collect()
    }
}

fn price_value(v: Option<f64>) -> Value {
    v.and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

impl Serialize for PriceSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys: Vec<SnapshotKey> = SnapshotKey::all().collect();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            map.serialize_entry(&key.to_string(), &self.value(key))?;
        }
        map.end()
    }
}

/// How a host should present one snapshot value
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SensorDescription {
    pub key: String,
    pub name: String,
    pub unit: Option<&'static str>,
}

/// One descriptor per snapshot key, e.g. `today_14` -> "Nomos Today 14:00"
pub fn sensor_descriptions() -> Vec<SensorDescription> {
    SnapshotKey::all().map(describe).collect()
}

pub fn describe(key: SnapshotKey) -> SensorDescription {
    let name = match key {
        SnapshotKey::Hour(day, hour) => format!("Nomos {} {:02}:00", day.label(), hour),
        SnapshotKey::CurrentPrice => "Nomos Current Price".to_string(),
        SnapshotKey::LastUpdateTime => "Nomos Last Update".to_string(),
        SnapshotKey::LastUpdateSuccess => "Nomos Last Update Success".to_string(),
    };
    SensorDescription {
        key: key.to_string(),
        name,
        unit: key.is_price().then_some(PRICE_UNIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 14, 5, 0)
            .unwrap()
    }

    #[test]
    fn key_display_and_parse() {
        let key = SnapshotKey::Hour(Day::Tomorrow, 7);
        assert_eq!(key.to_string(), "tomorrow_07");
        assert_eq!("tomorrow_07".parse::<SnapshotKey>(), Ok(key));
        assert_eq!(
            "current_price".parse::<SnapshotKey>(),
            Ok(SnapshotKey::CurrentPrice)
        );
        assert!("today_24".parse::<SnapshotKey>().is_err());
        assert!("today_7".parse::<SnapshotKey>().is_err());
        assert!("yesterday_01".parse::<SnapshotKey>().is_err());
    }

    #[test]
    fn every_key_is_present() {
        let map = PriceSnapshot::empty(stamp()).to_map();
        assert_eq!(map.len(), 48 + 3);
        assert_eq!(map["today_00"], Value::Null);
        assert_eq!(map["tomorrow_23"], Value::Null);
        assert_eq!(map["current_price"], Value::Null);
        assert_eq!(map["last_update_success"], Value::Bool(true));
        assert_eq!(
            map["last_update_time"],
            Value::String("2024-01-15T14:05:00.000000+01:00".to_string())
        );
    }

    #[test]
    fn set_hour_and_current_price() {
        let mut snapshot = PriceSnapshot::empty(stamp());
        snapshot.set_hour(Day::Today, 14, Some(12.5));
        snapshot.set_hour(Day::Today, 30, Some(99.0));
        snapshot.select_current_hour(14);

        assert_eq!(snapshot.current_price(), Some(12.5));
        assert_eq!(snapshot.filled_hours(), 1);
        assert_eq!(snapshot.get("today_14"), Some(serde_json::json!(12.5)));
        assert_eq!(snapshot.get("bogus"), None);
    }

    #[test]
    fn serializes_as_flat_map() {
        let mut snapshot = PriceSnapshot::empty(stamp());
        snapshot.set_hour(Day::Tomorrow, 0, Some(8.25));
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["tomorrow_00"], serde_json::json!(8.25));
        assert_eq!(json.as_object().map(Map::len), Some(51));
    }

    #[test]
    fn sensor_names() {
        let sensors = sensor_descriptions();
        assert_eq!(sensors.len(), 51);
        assert_eq!(sensors[0].name, "Nomos Current Price");
        let today_14 = sensors.iter().find(|s| s.key == "today_14").unwrap();
        assert_eq!(today_14.name, "Nomos Today 14:00");
        assert_eq!(today_14.unit, Some(PRICE_UNIT));
        let success = sensors
            .iter()
            .find(|s| s.key == LAST_UPDATE_SUCCESS_KEY)
            .unwrap();
        assert_eq!(success.unit, None);
    }
}
