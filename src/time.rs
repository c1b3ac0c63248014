use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// A timetable instant with minute precision.
///
/// Hours keep counting past midnight (`25:30` is a valid departure on the
/// previous service day), so this is not a wall clock time. The source format
/// carries a seconds field, but the encoding has no room for it: any nonzero
/// seconds value is a broken assumption and must abort the run.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ScheduleTime {
    pub hours: u8,
    pub minutes: u8,
}

impl ScheduleTime {
    pub fn new(hours: u8, minutes: u8) -> Self {
        ScheduleTime { hours, minutes }
    }

    /// Parses `HH:MM:SS`, rejecting sub-minute precision.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split(':');
        let (hours, minutes, seconds) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(m), Some(s)) if parts.next().is_none() => (h, m, s),
            _ => return Err(Error::InvalidTime(raw.to_string())),
        };

        let hours: u8 = hours
            .trim()
            .parse()
            .map_err(|_| Error::InvalidTime(raw.to_string()))?;
        let minutes: u8 = minutes
            .trim()
            .parse()
            .map_err(|_| Error::InvalidTime(raw.to_string()))?;
        let seconds: u8 = seconds
            .trim()
            .parse()
            .map_err(|_| Error::InvalidTime(raw.to_string()))?;

        if seconds != 0 {
            return Err(Error::SubMinutePrecision(raw.to_string()));
        }
        if minutes >= 60 {
            return Err(Error::InvalidTime(raw.to_string()));
        }

        Ok(ScheduleTime { hours, minutes })
    }

    /// Two checked byte writes, hours then minutes.
    pub fn encode(&self, section: &mut crate::archive::Section) -> Result<()> {
        section.write_i8(self.hours as i32)?;
        section.write_i8(self.minutes as i32)
    }

    /// Signed difference in minutes, `self - other`.
    pub fn minutes_diff(&self, other: &ScheduleTime) -> i32 {
        (self.hours as i32 - other.hours as i32) * 60 + (self.minutes as i32 - other.minutes as i32)
    }
}

impl Ord for ScheduleTime {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.hours, self.minutes).cmp(&(other.hours, other.minutes))
    }
}

impl PartialOrd for ScheduleTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn parses_and_orders_past_midnight_times() {
        let late = ScheduleTime::parse("25:30:00").unwrap();
        let early = ScheduleTime::parse("00:10:00").unwrap();
        assert_eq!(late, ScheduleTime::new(25, 30));
        assert!(late > early);
        assert_eq!(late.minutes_diff(&early), 25 * 60 + 20);
        assert_eq!(early.minutes_diff(&late), -(25 * 60 + 20));
    }

    #[test]
    fn nonzero_seconds_is_fatal() {
        match ScheduleTime::parse("08:00:30") {
            Err(Error::SubMinutePrecision(raw)) => assert_eq!(raw, "08:00:30"),
            other => panic!("expected sub-minute error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_literals_are_rejected() {
        assert!(ScheduleTime::parse("08:00").is_err());
        assert!(ScheduleTime::parse("8h30m00s").is_err());
        assert!(ScheduleTime::parse("08:61:00").is_err());
    }
}
