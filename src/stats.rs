use crate::clock::DayKey;
use crate::models::{CountTable, DayTotal};
use chrono::{Duration, NaiveDate};

/// Totals for the `days` days ending at `today`, oldest first. Days without an
/// entry count as zero.
pub fn recent_days_at(today: NaiveDate, table: &CountTable, days: u32) -> Vec<DayTotal> {
    (0..i64::from(days))
        .rev()
        .map(|offset| {
            let date = DayKey::from_date(today - Duration::days(offset));
            let count = table.get(&date).copied().unwrap_or(0);
            DayTotal { date, count }
        })
        .collect()
}
