use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Local, Utc};

/// Rejected cron expression. The running job is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cron expression '{expression}': {reason}")]
pub struct InvalidScheduleError {
    pub expression: String,
    pub reason: String,
}

/// A validated cron cadence.
///
/// Five-field expressions (`min hour dom month dow`) are read the way crontab reads
/// them: seconds pinned to zero and day-of-week `0`/`7` meaning Sunday. Six and seven
/// field expressions and `@daily`-style shorthands go to the parser unchanged.
#[derive(Debug, Clone)]
pub struct Cadence {
    expression: String,
    schedule: cron::Schedule,
}

impl Cadence {
    pub fn parse(expression: &str) -> Result<Self, InvalidScheduleError> {
        let trimmed = expression.trim();
        let invalid = |reason: String| InvalidScheduleError {
            expression: expression.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("expression is empty".to_string()));
        }

        let normalized = normalize(trimmed);
        let schedule =
            cron::Schedule::from_str(&normalized).map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

fn normalize(expression: &str) -> String {
    if expression.starts_with('@') {
        return expression.to_string();
    }

    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return fields.join(" ");
    }

    format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        day_of_week_names(fields[4])
    )
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrites crontab day numbers (0-7, both ends Sunday) as explicit name lists.
/// Items that are not purely numeric, and a bare `*`, reach the parser unchanged.
fn day_of_week_names(field: &str) -> String {
    field
        .split(',')
        .map(|item| match crontab_days(item) {
            Some(days) => days
                .into_iter()
                .map(|day| DAY_NAMES[day])
                .collect::<Vec<_>>()
                .join(","),
            None => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Days selected by one list item, `0` being Sunday. `None` when the item is not
/// numeric crontab syntax.
fn crontab_days(item: &str) -> Option<BTreeSet<usize>> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step.parse::<usize>().ok().filter(|step| *step > 0)?)),
        None => (item, None),
    };

    let (first, last) = match (range, step) {
        ("*", None) => return None,
        ("*", Some(_)) => (0, 6),
        _ => match range.split_once('-') {
            Some((first, last)) => (first.parse::<usize>().ok()?, last.parse::<usize>().ok()?),
            None => {
                let first = range.parse::<usize>().ok()?;
                (first, if step.is_some() { 7 } else { first })
            }
        },
    };
    if first > last || last > 7 {
        return None;
    }

    Some(
        (first..=last)
            .step_by(step.unwrap_or(1))
            .map(|day| day % 7)
            .collect(),
    )
}

/// Clock the cadence is evaluated in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleClock {
    #[default]
    Utc,
    Local,
}

impl ScheduleClock {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "utc" => Some(Self::Utc),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, cadence: &Cadence, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ScheduleClock::Utc => cadence.schedule.after(&after).next(),
            ScheduleClock::Local => cadence
                .schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|fire| fire.with_timezone(&Utc)),
        }
    }

    pub fn upcoming(
        &self,
        cadence: &Cadence,
        after: DateTime<Utc>,
        count: usize,
    ) -> Vec<DateTime<Utc>> {
        let mut fires = Vec::with_capacity(count);
        let mut cursor = after;
        while fires.len() < count {
            match self.next_after(cadence, cursor) {
                Some(fire) => {
                    fires.push(fire);
                    cursor = fire;
                }
                None => break,
            }
        }
        fires
    }
}

/// Current cron expression of the scraper job, shared between the job handle and readers.
/// Lives only in memory: a restart falls back to the configured default.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    current: Arc<RwLock<String>>,
}

impl ScheduleState {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(expression.into())),
        }
    }

    pub fn current(&self) -> String {
        self.current
            .read()
            .expect("schedule state lock poisoned")
            .clone()
    }

    pub(crate) fn replace(&self, expression: impl Into<String>) {
        *self.current.write().expect("schedule state lock poisoned") = expression.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn daily_midnight_fires_next_midnight() {
        let cadence = Cadence::parse("0 0 * * *").expect("valid cron");
        let next = ScheduleClock::Utc
            .next_after(&cadence, at(2025, 3, 14, 15, 30))
            .expect("has next fire");
        assert_eq!(next, at(2025, 3, 15, 0, 0));
    }

    #[test]
    fn keeps_trimmed_expression_text() {
        let cadence = Cadence::parse("  */15 * * * *  ").expect("valid cron");
        assert_eq!(cadence.expression(), "*/15 * * * *");
    }

    #[test]
    fn crontab_weekday_numbers_start_on_sunday() {
        let cadence = Cadence::parse("30 9 * * 1-5").expect("valid cron");
        // 2025-03-15 is a Saturday.
        let next = ScheduleClock::Utc
            .next_after(&cadence, at(2025, 3, 15, 12, 0))
            .expect("has next fire");
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!((next.hour(), next.minute()), (9, 30));

        let whole_week = Cadence::parse("0 9 * * 1-7").expect("monday through sunday");
        let next = ScheduleClock::Utc
            .next_after(&whole_week, at(2025, 3, 15, 12, 0))
            .expect("has next fire");
        assert_eq!(next.weekday(), Weekday::Sun);
        assert_eq!(next.hour(), 9);

        let weekend = Cadence::parse("0 9 * * 6-7").expect("saturday and sunday");
        let next = ScheduleClock::Utc
            .next_after(&weekend, at(2025, 3, 15, 12, 0))
            .expect("has next fire");
        assert_eq!(next.weekday(), Weekday::Sun);

        let sunday = Cadence::parse("0 6 * * 0").expect("sunday as zero");
        let next = ScheduleClock::Utc
            .next_after(&sunday, at(2025, 3, 15, 12, 0))
            .expect("has next fire");
        assert_eq!(next.weekday(), Weekday::Sun);
    }

    #[test]
    fn day_of_week_items_expand_to_names() {
        assert_eq!(normalize("0 9 * * 1-7"), "0 0 9 * * Sun,Mon,Tue,Wed,Thu,Fri,Sat");
        assert_eq!(normalize("0 9 * * */2"), "0 0 9 * * Sun,Tue,Thu,Sat");
        assert_eq!(normalize("0 9 * * 1,7"), "0 0 9 * * Mon,Sun");
        assert_eq!(normalize("0 9 * * *"), "0 0 9 * * *");
        assert_eq!(normalize("0 9 * * MON-FRI"), "0 0 9 * * MON-FRI");
    }

    #[test]
    fn accepts_seconds_field_and_shorthands() {
        assert!(Cadence::parse("*/5 * * * * *").is_ok());
        assert!(Cadence::parse("@daily").is_ok());
        assert!(Cadence::parse("@hourly").is_ok());
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expression in ["not-a-cron", "", "61 * * * *", "* * *"] {
            let err = Cadence::parse(expression).expect_err("must be rejected");
            assert_eq!(err.expression, expression);
        }
    }

    #[test]
    fn upcoming_lists_consecutive_fires() {
        let cadence = Cadence::parse("0 */6 * * *").expect("valid cron");
        let fires = ScheduleClock::Utc.upcoming(&cadence, at(2025, 1, 1, 1, 0), 3);
        assert_eq!(
            fires,
            vec![at(2025, 1, 1, 6, 0), at(2025, 1, 1, 12, 0), at(2025, 1, 1, 18, 0)]
        );
    }

    #[test]
    fn state_is_replaced_wholesale() {
        let state = ScheduleState::new("0 0 * * *");
        let reader = state.clone();
        state.replace("*/10 * * * *");
        assert_eq!(reader.current(), "*/10 * * * *");
    }
}
