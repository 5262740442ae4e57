//! DAG schedules and the nominal time window of a run.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Months, TimeDelta, Utc};
use croner::Cron;
use serde::{Deserialize, Serialize};

use crate::error::LineageError;

/// How often a DAG runs.
///
/// Parsed from the usual presets (`@hourly`, `@daily`, ...), from a fixed
/// interval written as `@every <n><unit>` with unit `s`, `m`, `h` or `d`, or
/// from a five-field cron expression such as `0 9 * * 1-5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Schedule {
    Once,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Every(Duration),
    /// A cron expression, validated when parsed and kept whitespace-normalized.
    Cron(String),
}

impl Schedule {
    /// The tick after `from`, or `None` when the schedule never repeats.
    pub fn following(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Once => None,
            Schedule::Hourly => from.checked_add_signed(TimeDelta::hours(1)),
            Schedule::Daily => from.checked_add_signed(TimeDelta::days(1)),
            Schedule::Weekly => from.checked_add_signed(TimeDelta::weeks(1)),
            Schedule::Monthly => from.checked_add_months(Months::new(1)),
            Schedule::Yearly => from.checked_add_months(Months::new(12)),
            Schedule::Every(interval) => TimeDelta::from_std(*interval)
                .ok()
                .and_then(|delta| from.checked_add_signed(delta)),
            Schedule::Cron(expr) => Cron::new(expr)
                .parse()
                .ok()?
                .find_next_occurrence(&from, false)
                .ok(),
        }
    }
}

impl FromStr for Schedule {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let schedule = match s {
            "@once" => Schedule::Once,
            "@hourly" => Schedule::Hourly,
            "@daily" | "@midnight" => Schedule::Daily,
            "@weekly" => Schedule::Weekly,
            "@monthly" => Schedule::Monthly,
            "@yearly" | "@annually" => Schedule::Yearly,
            _ if s.starts_with('@') => {
                let interval = s
                    .strip_prefix("@every")
                    .and_then(|rest| parse_interval(rest.trim()))
                    .ok_or_else(|| LineageError::InvalidSchedule(s.to_string()))?;
                Schedule::Every(interval)
            }
            _ => {
                let expr = s.split_whitespace().collect::<Vec<_>>().join(" ");
                Cron::new(&expr)
                    .parse()
                    .map_err(|e| LineageError::InvalidSchedule(format!("{s}: {e}")))?;
                Schedule::Cron(expr)
            }
        };
        Ok(schedule)
    }
}

fn parse_interval(s: &str) -> Option<Duration> {
    let split = s.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits.parse().ok()?;
    if n == 0 {
        return None;
    }
    let secs = match unit {
        "s" => n,
        "m" => n.checked_mul(60)?,
        "h" => n.checked_mul(3_600)?,
        "d" => n.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Once => write!(f, "@once"),
            Schedule::Hourly => write!(f, "@hourly"),
            Schedule::Daily => write!(f, "@daily"),
            Schedule::Weekly => write!(f, "@weekly"),
            Schedule::Monthly => write!(f, "@monthly"),
            Schedule::Yearly => write!(f, "@yearly"),
            Schedule::Every(interval) => write!(f, "@every {}s", interval.as_secs()),
            Schedule::Cron(expr) => f.write_str(expr),
        }
    }
}

impl TryFrom<String> for Schedule {
    type Error = LineageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> Self {
        schedule.to_string()
    }
}

/// Nominal start and end of a run, as reported with the job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NominalWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl NominalWindow {
    /// Window of a run executing at `execution_date` under `schedule`.
    pub fn for_run(execution_date: DateTime<Utc>, schedule: Option<&Schedule>) -> Self {
        Self {
            start: Some(execution_date),
            end: schedule.and_then(|s| s.following(execution_date)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan_31() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 1, 31, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_presets() {
        assert_eq!("@daily".parse::<Schedule>().unwrap(), Schedule::Daily);
        assert_eq!(" @hourly ".parse::<Schedule>().unwrap(), Schedule::Hourly);
        assert_eq!("@annually".parse::<Schedule>().unwrap(), Schedule::Yearly);
        assert_eq!("@once".parse::<Schedule>().unwrap(), Schedule::Once);
    }

    #[test]
    fn test_parse_fixed_interval() {
        assert_eq!(
            "@every 15m".parse::<Schedule>().unwrap(),
            Schedule::Every(Duration::from_secs(900))
        );
        assert_eq!(
            "@every 2d".parse::<Schedule>().unwrap(),
            Schedule::Every(Duration::from_secs(172_800))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["daily", "@every", "@every 0s", "@every 5w", "@every m", "@often", "0 25 * * *"] {
            assert!(bad.parse::<Schedule>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_display_parses_back() {
        for schedule in [
            Schedule::Weekly,
            Schedule::Monthly,
            Schedule::Every(Duration::from_secs(90)),
            Schedule::Cron("0 9 * * 1-5".into()),
        ] {
            assert_eq!(schedule.to_string().parse::<Schedule>().unwrap(), schedule);
        }
    }

    #[test]
    fn test_following() {
        let at = jan_31();
        assert_eq!(
            Schedule::Daily.following(at),
            Some(Utc.with_ymd_and_hms(2016, 2, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            Schedule::Hourly.following(at),
            Some(Utc.with_ymd_and_hms(2016, 1, 31, 1, 0, 0).unwrap())
        );
        // Month arithmetic clamps to the last day of February.
        assert_eq!(
            Schedule::Monthly.following(at),
            Some(Utc.with_ymd_and_hms(2016, 2, 29, 0, 0, 0).unwrap())
        );
        assert_eq!(Schedule::Once.following(at), None);
    }

    #[test]
    fn test_parse_cron() {
        assert_eq!(
            "0  9 * *   *".parse::<Schedule>().unwrap(),
            Schedule::Cron("0 9 * * *".into())
        );
    }

    #[test]
    fn test_cron_following() {
        // 2016-01-01 is a Friday.
        let new_year = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let daily_nine: Schedule = "0 9 * * *".parse().unwrap();
        assert_eq!(
            daily_nine.following(new_year),
            Some(Utc.with_ymd_and_hms(2016, 1, 1, 9, 0, 0).unwrap())
        );

        let monday_morning: Schedule = "30 6 * * 1".parse().unwrap();
        assert_eq!(
            monday_morning.following(new_year),
            Some(Utc.with_ymd_and_hms(2016, 1, 4, 6, 30, 0).unwrap())
        );

        // Strictly after: a run at a tick ends at the next tick.
        let at_tick = Utc.with_ymd_and_hms(2016, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(
            daily_nine.following(at_tick),
            Some(Utc.with_ymd_and_hms(2016, 1, 2, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_window_for_unscheduled_run() {
        let window = NominalWindow::for_run(jan_31(), None);
        assert_eq!(window.start, Some(jan_31()));
        assert_eq!(window.end, None);
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Deserialize)]
        struct Holder {
            schedule: Schedule,
        }
        let holder: Holder = toml::from_str(r#"schedule = "@weekly""#).unwrap();
        assert_eq!(holder.schedule, Schedule::Weekly);
        let holder: Holder = toml::from_str(r#"schedule = "0 9 * * *""#).unwrap();
        assert_eq!(holder.schedule, Schedule::Cron("0 9 * * *".into()));
        assert!(toml::from_str::<Holder>(r#"schedule = "sometimes""#).is_err());
    }
}
