use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc, Weekday,
};
use thiserror::Error;

/// When check-ins are accepted: one weekday, an inclusive minute window,
/// and the fixed offset that defines "local" time for both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttendancePolicy {
    pub weekday: Weekday,
    /// Minutes since local midnight, inclusive
    pub window_start: u32,
    /// Minutes since local midnight, inclusive
    pub window_end: u32,
    pub utc_offset: FixedOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowViolation {
    #[error("Attendance is only open on {}", day_name(.open_on))]
    WrongDay { open_on: Weekday },

    #[error("Attendance is only open between {} and {}", hhmm(.start), hhmm(.end))]
    OutsideHours { start: u32, end: u32 },
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unknown weekday {0:?}")]
    Weekday(String),
    #[error("invalid time of day {0:?}, expected HH:MM")]
    TimeOfDay(String),
    #[error("invalid UTC offset {0:?}, expected e.g. +07:00")]
    Offset(String),
    #[error("window start {start} is after window end {end}")]
    EmptyWindow { start: String, end: String },
}

impl AttendancePolicy {
    pub fn new(
        weekday: Weekday,
        start: NaiveTime,
        end: NaiveTime,
        utc_offset: FixedOffset,
    ) -> Result<Self, PolicyError> {
        let window_start = minute_of_day(start);
        let window_end = minute_of_day(end);
        if window_start > window_end {
            return Err(PolicyError::EmptyWindow {
                start: hhmm(&window_start),
                end: hhmm(&window_end),
            });
        }

        Ok(Self {
            weekday,
            window_start,
            window_end,
            utc_offset,
        })
    }

    /// Builds a policy from its textual configuration, e.g.
    /// `("Sun", "08:30", "12:00", "+07:00")`.
    pub fn parse(weekday: &str, start: &str, end: &str, offset: &str) -> Result<Self, PolicyError> {
        let weekday = weekday
            .trim()
            .parse::<Weekday>()
            .map_err(|_| PolicyError::Weekday(weekday.to_string()))?;
        let start = parse_time(start)?;
        let end = parse_time(end)?;
        let utc_offset = offset
            .trim()
            .parse::<FixedOffset>()
            .map_err(|_| PolicyError::Offset(offset.to_string()))?;

        Self::new(weekday, start, end, utc_offset)
    }

    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.utc_offset)
    }

    /// The local calendar day an instant belongs to. Every duplicate check
    /// and every stored entry goes through this one function.
    pub fn calendar_day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }

    /// First and last instant (millisecond precision) of a local calendar day.
    /// `None` at the edges of chrono's representable range.
    pub fn day_bounds(&self, day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = day.and_time(NaiveTime::MIN);
        let end = start
            .checked_add_signed(Duration::days(1))?
            .checked_sub_signed(Duration::milliseconds(1))?;
        Some((self.to_utc(start)?, self.to_utc(end)?))
    }

    /// Converts a local wall-clock reading to UTC under this policy's offset.
    pub fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        let shift = Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        local
            .checked_sub_signed(shift)
            .map(|utc| Utc.from_utc_datetime(&utc))
    }

    /// Weekday and minute-window checks, in that order.
    pub fn check_window(&self, instant: DateTime<Utc>) -> Result<(), WindowViolation> {
        let local = self.local(instant);

        if local.weekday() != self.weekday {
            return Err(WindowViolation::WrongDay {
                open_on: self.weekday,
            });
        }

        let minute = minute_of_day(local.time());
        if minute < self.window_start || minute > self.window_end {
            return Err(WindowViolation::OutsideHours {
                start: self.window_start,
                end: self.window_end,
            });
        }

        Ok(())
    }
}

impl Default for AttendancePolicy {
    /// Sunday 08:30–12:00 at UTC+7.
    fn default() -> Self {
        Self {
            weekday: Weekday::Sun,
            window_start: 8 * 60 + 30,
            window_end: 12 * 60,
            utc_offset: FixedOffset::east_opt(7 * 3600).expect("UTC+7 is a valid offset"),
        }
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn parse_time(raw: &str) -> Result<NaiveTime, PolicyError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| PolicyError::TimeOfDay(raw.to_string()))
}

fn hhmm(minutes: &u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn day_name(day: &Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
