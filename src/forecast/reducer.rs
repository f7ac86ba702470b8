use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use super::models::{ForecastResult, ForecastSample, PeriodSummary};

/// How the temperature-defining sample of a period is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Lowest temperature, first one wins on ties
    Coldest,
    /// Highest temperature, first one wins on ties
    Warmest,
    /// First sample in input order
    Earliest,
}

/// A wall-clock instant relative to the reference day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowBound {
    pub day_offset: i64,
    pub hour: u32,
}

impl WindowBound {
    pub const fn new(day_offset: i64, hour: u32) -> Self {
        Self { day_offset, hour }
    }

    fn offset_hours(self) -> i64 {
        self.day_offset * 24 + i64::from(self.hour)
    }

    fn resolve(self, today: NaiveDate, tz: Tz) -> DateTime<Utc> {
        let naive = today.and_time(chrono::NaiveTime::MIN)
            + Duration::days(self.day_offset)
            + Duration::hours(i64::from(self.hour));
        local_to_utc(naive, tz)
    }
}

/// One period of the card: where its window starts and ends relative to the
/// reference day, and which sample represents it.
///
/// Windows are resolved in the reference timezone, so the host's local zone
/// never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PeriodRule {
    pub start: WindowBound,
    pub end: WindowBound,
    pub selection: Selection,
}

impl PeriodRule {
    /// Hours within a day and an end strictly after the start
    pub fn is_valid(&self) -> bool {
        self.start.hour <= 24
            && self.end.hour <= 24
            && self.end.offset_hours() > self.start.offset_hours()
    }
}

/// Today 20:00 until tomorrow 08:00, coldest sample
pub const NIGHT: PeriodRule = PeriodRule {
    start: WindowBound::new(0, 20),
    end: WindowBound::new(1, 8),
    selection: Selection::Coldest,
};

/// Tomorrow 08:00 until tomorrow 20:00, warmest sample
pub const DAY: PeriodRule = PeriodRule {
    start: WindowBound::new(1, 8),
    end: WindowBound::new(1, 20),
    selection: Selection::Warmest,
};

/// The two periods drawn on the card. Either may be overridden from
/// configuration, e.g. a same-day card with an `earliest` day rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Periods {
    #[serde(default = "default_night")]
    pub night: PeriodRule,
    #[serde(default = "default_day")]
    pub day: PeriodRule,
}

impl Default for Periods {
    fn default() -> Self {
        Self {
            night: NIGHT,
            day: DAY,
        }
    }
}

fn default_night() -> PeriodRule {
    NIGHT
}

fn default_day() -> PeriodRule {
    DAY
}

/// Resolved window. The end is inclusive unless another window starts there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub closed_end: bool,
}

impl TimeWindow {
    pub fn contains(&self, timestamp: i64) -> bool {
        let start = self.start.timestamp();
        let end = self.end.timestamp();
        if self.closed_end {
            timestamp >= start && timestamp <= end
        } else {
            timestamp >= start && timestamp < end
        }
    }
}

fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Wall-clock time skipped by a DST jump: use the offset in force just before it
        LocalResult::None => {
            let before = naive - Duration::hours(1);
            tz.from_local_datetime(&before)
                .earliest()
                .map(|t| t.with_timezone(&Utc) + Duration::hours(1))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Resolve every rule into a concrete window for the day containing `reference`.
pub fn resolve_windows<const N: usize>(
    rules: &[PeriodRule; N],
    reference: DateTime<Utc>,
    tz: Tz,
) -> [TimeWindow; N] {
    let today = reference.with_timezone(&tz).date_naive();
    let starts = rules.map(|rule| rule.start.resolve(today, tz));

    rules.map(|rule| {
        let start = rule.start.resolve(today, tz);
        let end = rule.end.resolve(today, tz);
        TimeWindow {
            start,
            end,
            closed_end: !starts.contains(&end),
        }
    })
}

/// Assign each sample to the first window containing it, keeping input order.
pub fn partition<'a, const N: usize>(
    samples: &'a [ForecastSample],
    windows: &[TimeWindow; N],
) -> [Vec<&'a ForecastSample>; N] {
    let mut buckets: [Vec<&ForecastSample>; N] = std::array::from_fn(|_| Vec::new());

    for sample in samples {
        if let Some(index) = windows.iter().position(|w| w.contains(sample.timestamp)) {
            buckets[index].push(sample);
        }
    }

    buckets
}

/// Round half up, matching how the card has always displayed temperatures.
fn round_temperature(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

fn target_point<'a>(
    points: &[&'a ForecastSample],
    selection: Selection,
) -> Option<&'a ForecastSample> {
    let (first, rest) = points.split_first()?;
    let mut target = *first;

    for &point in rest {
        let better = match selection {
            Selection::Coldest => point.temperature < target.temperature,
            Selection::Warmest => point.temperature > target.temperature,
            Selection::Earliest => false,
        };
        if better {
            target = point;
        }
    }

    Some(target)
}

/// Reduce one partition into its summary.
///
/// Temperature always comes from the target point. When the partition holds
/// rain or snow, the first such sample supplies the remaining fields.
pub fn summarize(points: &[&ForecastSample], selection: Selection) -> PeriodSummary {
    let Some(target) = target_point(points, selection) else {
        return PeriodSummary::fallback();
    };

    let display = points
        .iter()
        .copied()
        .find(|p| p.is_precipitation())
        .unwrap_or(target);

    PeriodSummary {
        temperature: round_temperature(target.temperature),
        description: display.weather_description.clone(),
        icon_code: display.icon_code.clone(),
        humidity: display.humidity,
        wind_speed: display.wind_speed,
    }
}

/// Reduce samples into one summary per rule.
pub fn reduce_periods<const N: usize>(
    samples: &[ForecastSample],
    reference: DateTime<Utc>,
    tz: Tz,
    rules: &[PeriodRule; N],
) -> [PeriodSummary; N] {
    let windows = resolve_windows(rules, reference, tz);
    let buckets = partition(samples, &windows);

    for (window, bucket) in windows.iter().zip(&buckets) {
        tracing::debug!(
            start = %window.start,
            end = %window.end,
            samples = bucket.len(),
            "Partitioned forecast window"
        );
    }

    std::array::from_fn(|i| summarize(&buckets[i], rules[i].selection))
}

/// Night/day reduction relative to the day containing `reference`.
pub fn reduce(
    samples: &[ForecastSample],
    reference: DateTime<Utc>,
    tz: Tz,
    periods: &Periods,
) -> ForecastResult {
    let [night, day] = reduce_periods(samples, reference, tz, &[periods.night, periods.day]);
    ForecastResult { night, day }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::models::{DEFAULT_ICON_CODE, UNKNOWN_DESCRIPTION};
    use chrono_tz::Europe::Kyiv;

    /// 2026-01-15 12:00 in Kyiv (UTC+2)
    fn reference() -> DateTime<Utc> {
        Kyiv.with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn kyiv_ts(day: u32, hour: u32) -> i64 {
        Kyiv.with_ymd_and_hms(2026, 1, day, hour, 0, 0)
            .single()
            .unwrap()
            .timestamp()
    }

    fn sample(timestamp: i64, temperature: f64, main: &str) -> ForecastSample {
        ForecastSample {
            timestamp,
            temperature,
            weather_main: main.to_string(),
            weather_description: format!("{} at {}", main.to_lowercase(), timestamp),
            icon_code: format!("{}-icon", main.to_lowercase()),
            humidity: (timestamp % 100) as u32,
            wind_speed: (timestamp % 7) as f64,
        }
    }

    #[test]
    fn test_windows_use_reference_timezone() {
        let [night, day] = resolve_windows(&[NIGHT, DAY], reference(), Kyiv);

        assert_eq!(night.start, Utc.with_ymd_and_hms(2026, 1, 15, 18, 0, 0).unwrap());
        assert_eq!(night.end, Utc.with_ymd_and_hms(2026, 1, 16, 6, 0, 0).unwrap());
        assert_eq!(day.start, Utc.with_ymd_and_hms(2026, 1, 16, 6, 0, 0).unwrap());
        assert_eq!(day.end, Utc.with_ymd_and_hms(2026, 1, 16, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_shared_boundary_is_open_on_earlier_window() {
        let [night, day] = resolve_windows(&[NIGHT, DAY], reference(), Kyiv);

        assert!(!night.closed_end);
        assert!(day.closed_end);
        assert!(!night.contains(kyiv_ts(16, 8)));
        assert!(day.contains(kyiv_ts(16, 8)));
        assert!(day.contains(kyiv_ts(16, 20)));
    }

    #[test]
    fn test_late_evening_reference_still_targets_tomorrow() {
        let late = Kyiv
            .with_ymd_and_hms(2026, 1, 15, 23, 30, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc);
        let [night, _] = resolve_windows(&[NIGHT, DAY], late, Kyiv);
        assert_eq!(night.start, Utc.with_ymd_and_hms(2026, 1, 15, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_partition_assigns_each_sample_once() {
        let samples = vec![
            sample(kyiv_ts(15, 17), 1.0, "Clear"),
            sample(kyiv_ts(15, 20), 2.0, "Clear"),
            sample(kyiv_ts(16, 8), 3.0, "Clear"),
            sample(kyiv_ts(16, 20), 4.0, "Clear"),
            sample(kyiv_ts(16, 23), 5.0, "Clear"),
        ];
        let windows = resolve_windows(&[NIGHT, DAY], reference(), Kyiv);
        let [night, day] = partition(&samples, &windows);

        let night_temps: Vec<f64> = night.iter().map(|s| s.temperature).collect();
        let day_temps: Vec<f64> = day.iter().map(|s| s.temperature).collect();
        assert_eq!(night_temps, vec![2.0]);
        assert_eq!(day_temps, vec![3.0, 4.0]);
    }

    #[test]
    fn test_overlapping_rules_do_not_double_count() {
        let wide = PeriodRule {
            start: WindowBound::new(0, 0),
            end: WindowBound::new(2, 0),
            selection: Selection::Earliest,
        };
        let samples = vec![sample(kyiv_ts(16, 11), 7.0, "Clear")];
        let windows = resolve_windows(&[wide, DAY], reference(), Kyiv);
        let [first, second] = partition(&samples, &windows);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_night_picks_minimum_and_day_picks_maximum() {
        let samples = vec![
            sample(kyiv_ts(15, 20), 1.4, "Clouds"),
            sample(kyiv_ts(15, 23), -3.6, "Clear"),
            sample(kyiv_ts(16, 2), -1.0, "Clear"),
            sample(kyiv_ts(16, 11), 4.2, "Clouds"),
            sample(kyiv_ts(16, 14), 6.5, "Clear"),
            sample(kyiv_ts(16, 17), 3.0, "Clouds"),
        ];

        let result = reduce(&samples, reference(), Kyiv, &Periods::default());

        assert_eq!(result.night.temperature, -4);
        assert_eq!(result.night.icon_code, "clear-icon");
        assert_eq!(result.day.temperature, 7);
        assert_eq!(result.day.description, samples[4].weather_description);
    }

    #[test]
    fn test_ties_resolve_to_first_sample() {
        let a = sample(kyiv_ts(16, 11), 5.0, "Clouds");
        let b = sample(kyiv_ts(16, 14), 5.0, "Clear");
        let summary = summarize(&[&a, &b], Selection::Warmest);
        assert_eq!(summary.description, a.weather_description);

        let summary = summarize(&[&a, &b], Selection::Coldest);
        assert_eq!(summary.description, a.weather_description);
    }

    #[test]
    fn test_precipitation_overrides_descriptive_fields() {
        let clear_morning = sample(10 * 3600, 3.0, "Clear");
        let rain = sample(14 * 3600, 9.0, "Rain");
        let clear_evening = sample(18 * 3600, 2.0, "Clear");

        let summary = summarize(&[&clear_morning, &rain, &clear_evening], Selection::Coldest);

        assert_eq!(summary.temperature, 2);
        assert_eq!(summary.description, rain.weather_description);
        assert_eq!(summary.icon_code, rain.icon_code);
        assert_eq!(summary.humidity, rain.humidity);
        assert_eq!(summary.wind_speed, rain.wind_speed);
    }

    #[test]
    fn test_first_precipitation_sample_wins() {
        let clear = sample(1000, 10.0, "Clear");
        let snow = sample(2000, -1.0, "Snow");
        let rain = sample(3000, 1.0, "Rain");

        let summary = summarize(&[&clear, &snow, &rain], Selection::Warmest);

        assert_eq!(summary.temperature, 10);
        assert_eq!(summary.description, snow.weather_description);
    }

    #[test]
    fn test_drizzle_is_not_precipitation_category() {
        let drizzle = sample(1000, 4.0, "Drizzle");
        let clear = sample(2000, 1.0, "Clear");

        let summary = summarize(&[&drizzle, &clear], Selection::Coldest);

        assert_eq!(summary.description, clear.weather_description);
    }

    #[test]
    fn test_empty_partition_uses_fallback() {
        let summary = summarize(&[], Selection::Coldest);
        assert_eq!(summary, PeriodSummary::fallback());
        assert_eq!(summary.temperature, 0);
        assert_eq!(summary.description, UNKNOWN_DESCRIPTION);
        assert_eq!(summary.icon_code, DEFAULT_ICON_CODE);
        assert_eq!(summary.humidity, 0);
        assert_eq!(summary.wind_speed, 0.0);
    }

    #[test]
    fn test_reduce_empty_list_is_total() {
        let result = reduce(&[], reference(), Kyiv, &Periods::default());
        assert_eq!(result.night, PeriodSummary::fallback());
        assert_eq!(result.day, PeriodSummary::fallback());
    }

    #[test]
    fn test_samples_outside_windows_are_ignored() {
        let samples = vec![
            sample(kyiv_ts(15, 14), -20.0, "Clear"),
            sample(kyiv_ts(17, 2), 40.0, "Clear"),
        ];
        let result = reduce(&samples, reference(), Kyiv, &Periods::default());
        assert_eq!(result.night, PeriodSummary::fallback());
        assert_eq!(result.day, PeriodSummary::fallback());
    }

    #[test]
    fn test_earliest_selection_keeps_input_order() {
        let a = sample(5000, 12.0, "Clouds");
        let b = sample(1000, 30.0, "Clear");
        let summary = summarize(&[&a, &b], Selection::Earliest);
        assert_eq!(summary.temperature, 12);
    }

    #[test]
    fn test_same_day_periods_with_earliest_day_sample() {
        // night of the reference day, then the first daytime sample after it
        let periods = Periods {
            night: PeriodRule {
                start: WindowBound::new(0, 0),
                end: WindowBound::new(0, 8),
                selection: Selection::Coldest,
            },
            day: PeriodRule {
                start: WindowBound::new(0, 8),
                end: WindowBound::new(0, 20),
                selection: Selection::Earliest,
            },
        };
        let samples = vec![
            sample(kyiv_ts(15, 2), -6.0, "Clear"),
            sample(kyiv_ts(15, 5), -8.2, "Clear"),
            sample(kyiv_ts(15, 11), 1.0, "Clouds"),
            sample(kyiv_ts(15, 14), 4.0, "Clouds"),
            sample(kyiv_ts(16, 11), 9.0, "Clear"),
        ];

        let result = reduce(&samples, reference(), Kyiv, &periods);

        assert_eq!(result.night.temperature, -8);
        assert_eq!(result.day.temperature, 1);
        assert_eq!(result.day.description, samples[2].weather_description);
    }

    #[test]
    fn test_period_rule_validity() {
        assert!(NIGHT.is_valid());
        assert!(DAY.is_valid());

        let backwards = PeriodRule {
            start: WindowBound::new(1, 8),
            end: WindowBound::new(0, 20),
            selection: Selection::Warmest,
        };
        assert!(!backwards.is_valid());

        let empty = PeriodRule {
            end: WindowBound::new(1, 8),
            ..DAY
        };
        assert!(!empty.is_valid());

        let bad_hour = PeriodRule {
            start: WindowBound::new(0, 25),
            ..NIGHT
        };
        assert!(!bad_hour.is_valid());
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(round_temperature(2.5), 3);
        assert_eq!(round_temperature(2.49), 2);
        assert_eq!(round_temperature(-2.5), -2);
        assert_eq!(round_temperature(-2.51), -3);
    }

    #[test]
    fn test_dst_gap_resolves_forward() {
        // Kyiv skips 03:00-04:00 on 2026-03-29
        let naive = NaiveDate::from_ymd_opt(2026, 3, 29)
            .unwrap()
            .and_hms_opt(3, 30, 0)
            .unwrap();
        let resolved = local_to_utc(naive, Kyiv);
        assert_eq!(resolved, Utc.with_ymd_and_hms(2026, 3, 29, 1, 30, 0).unwrap());
    }
}
