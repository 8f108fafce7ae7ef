use chrono::{Duration, NaiveDate};

/// Parse a compact `YYYYMMDD` date string, the form the simulation files
/// are keyed by.
pub fn parse_yyyymmdd(s: &str) -> Result<NaiveDate, String> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid date '{}': expected YYYYMMDD", s));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

/// Format a date back to the compact `YYYYMMDD` file-name form.
pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// All calendar days from `start` to `end`, both inclusive, ascending.
pub fn date_range_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        current += Duration::days(1);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yyyymmdd() {
        let date = parse_yyyymmdd("20130913").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2013, 9, 13).unwrap());

        assert!(parse_yyyymmdd("2013-09-13").is_err());
        assert!(parse_yyyymmdd("2013913").is_err());
        assert!(parse_yyyymmdd("20130230").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        let date = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
        assert_eq!(parse_yyyymmdd(&format_yyyymmdd(date)).unwrap(), date);
    }

    #[test]
    fn test_date_range_inclusive() {
        let start = NaiveDate::from_ymd_opt(2013, 9, 13).unwrap();
        let end = NaiveDate::from_ymd_opt(2013, 9, 15).unwrap();
        let days = date_range_inclusive(start, end);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0], start);
        assert_eq!(days[2], end);
    }

    #[test]
    fn test_date_range_single_day() {
        let day = NaiveDate::from_ymd_opt(2013, 9, 13).unwrap();
        assert_eq!(date_range_inclusive(day, day), vec![day]);
    }

    #[test]
    fn test_date_range_crosses_month() {
        let start = NaiveDate::from_ymd_opt(2013, 9, 29).unwrap();
        let end = NaiveDate::from_ymd_opt(2013, 10, 2).unwrap();
        let days = date_range_inclusive(start, end);
        assert_eq!(days.len(), 4);
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2013, 9, 30).unwrap());
        assert_eq!(days[2], NaiveDate::from_ymd_opt(2013, 10, 1).unwrap());
    }

    #[test]
    fn test_date_range_empty_when_reversed() {
        let start = NaiveDate::from_ymd_opt(2013, 9, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2013, 9, 13).unwrap();
        assert!(date_range_inclusive(start, end).is_empty());
    }
}
