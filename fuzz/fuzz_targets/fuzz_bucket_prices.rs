#![no_main]
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use nomos_prices::aggregator::bucket_prices;
use nomos_prices::nomos::PriceItem;

fuzz_target!(|data: &[u8]| {
    // One item per input line: "<timestamp>;<amount>"
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let items: Vec<PriceItem> = text
        .lines()
        .map(|line| {
            let (ts, amount) = line.split_once(';').unwrap_or((line, ""));
            PriceItem {
                timestamp: Some(ts.to_string()),
                amount: amount.trim().parse().ok(),
            }
        })
        .collect();

    let now = Utc.with_ymd_and_hms(2024, 10, 27, 1, 30, 0).unwrap();
    let out = bucket_prices(&items, now, chrono_tz::Europe::Berlin);
    assert!(out.snapshot.filled_hours() <= 48);
    assert_eq!(out.snapshot.to_map().len(), 51);
});
