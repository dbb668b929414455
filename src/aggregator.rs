//! Time bucketing of raw price items into a [`PriceSnapshot`]
//!
//! Raw items carry UTC timestamps. Each one is converted to the configured
//! zone and filed under `today_HH` or `tomorrow_HH`; anything outside those two
//! local days is discarded. Later items win over earlier ones for the same
//! hour, unfilled hours stay null, and `current_price` mirrors today's value at
//! the current local hour.

use crate::clock::Clock;
use crate::error::{NomosError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::nomos::{PriceItem, PriceSource};
use crate::snapshot::{Day, PriceSnapshot};
use chrono::{DateTime, Days, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Outcome of bucketing one batch of items
#[derive(Debug)]
pub struct Bucketed {
    pub snapshot: PriceSnapshot,
    /// Items dropped for an unusable timestamp
    pub rejected: Vec<NomosError>,
    /// Items without a timestamp
    pub missing_timestamp: usize,
    /// Items whose local date was neither today nor tomorrow
    pub out_of_window: usize,
}

/// Offset-bearing layouts tried after RFC 3339, with `Z` already rewritten
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Layouts without an offset, read as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an API timestamp as a UTC instant
///
/// Accepts ISO 8601 with `Z` or a numeric offset, `T` or space separator, and
/// second or minute precision; a timestamp without any offset is taken to be
/// UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{}+00:00", rest),
        None => trimmed.to_string(),
    };
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(NomosError::timestamp_parse(
        raw.to_string(),
        "not an ISO 8601 timestamp".to_string(),
    ))
}

/// Bucket raw items into a fresh snapshot relative to `now`
pub fn bucket_prices(items: &[PriceItem], now: DateTime<Utc>, tz: Tz) -> Bucketed {
    let now_local = now.with_timezone(&tz);
    let today = now_local.date_naive();
    let tomorrow = today.checked_add_days(Days::new(1));

    let mut snapshot = PriceSnapshot::empty(now_local.fixed_offset());
    let mut rejected = Vec::new();
    let mut missing_timestamp = 0;
    let mut out_of_window = 0;

    for item in items {
        let Some(raw) = item.timestamp.as_deref() else {
            missing_timestamp += 1;
            continue;
        };
        let local = match parse_timestamp(raw) {
            Ok(utc) => utc.with_timezone(&tz),
            Err(e) => {
                rejected.push(e);
                continue;
            }
        };

        let date = local.date_naive();
        let day = if date == today {
            Day::Today
        } else if Some(date) == tomorrow {
            Day::Tomorrow
        } else {
            out_of_window += 1;
            continue;
        };
        snapshot.set_hour(day, local.hour(), item.amount);
    }

    snapshot.select_current_hour(now_local.hour());

    Bucketed {
        snapshot,
        rejected,
        missing_timestamp,
        out_of_window,
    }
}

/// Turns fetched price items into snapshots, one per refresh
pub struct PriceAggregator<S: PriceSource> {
    source: S,
    tz: Tz,
    clock: Arc<dyn Clock>,
    logger: StructuredLogger,
}

impl<S: PriceSource> PriceAggregator<S> {
    pub fn new(source: S, tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            tz,
            clock,
            logger: get_logger("aggregator"),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Fetch and bucket; any fetch error aborts without a snapshot
    pub async fn refresh(&self) -> Result<PriceSnapshot> {
        let items = self
            .source
            .fetch_prices()
            .await
            .map_err(NomosError::refresh_failed)?;
        Ok(self.build_snapshot(&items))
    }

    /// Bucket already fetched items against the current clock
    pub fn build_snapshot(&self, items: &[PriceItem]) -> PriceSnapshot {
        let bucketed = bucket_prices(items, self.clock.now(), self.tz);

        for err in &bucketed.rejected {
            self.logger
                .warn(&format!("Skipping price item: {}", err));
        }
        if bucketed.missing_timestamp > 0 {
            self.logger.debug(&format!(
                "Skipped {} price items without timestamp",
                bucketed.missing_timestamp
            ));
        }
        if bucketed.out_of_window > 0 {
            self.logger.debug(&format!(
                "Discarded {} price items outside today/tomorrow",
                bucketed.out_of_window
            ));
        }
        self.logger.info(&format!(
            "Snapshot built from {} items: {} of 48 hours priced, current price {}",
            items.len(),
            bucketed.snapshot.filled_hours(),
            bucketed
                .snapshot
                .current_price()
                .map_or_else(|| "n/a".to_string(), |p| format!("{:.3}", p))
        ));
        bucketed.snapshot
    }
}
