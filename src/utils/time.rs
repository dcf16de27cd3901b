use chrono::{DateTime, Utc};

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3_600.0;
const DAY: f64 = 86_400.0;
const MONTH: f64 = 2_592_000.0;
const YEAR: f64 = 31_536_000.0;

/// 生成相对时间标签，例如 "5m ago"
///
/// 某个单位只有在经过的时间严格大于1个该单位时才会使用，
/// 未来的时间戳按 "0s ago" 处理。
pub fn time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = ((now - timestamp).num_milliseconds() / 1000).max(0) as f64;

    for (unit, suffix) in [(YEAR, "y"), (MONTH, "mo"), (DAY, "d"), (HOUR, "h"), (MINUTE, "m")] {
        let interval = seconds / unit;
        if interval > 1.0 {
            return format!("{}{} ago", interval.floor() as i64, suffix);
        }
    }

    format!("{}s ago", seconds as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn label(elapsed: Duration) -> String {
        let now = Utc::now();
        time_ago(now - elapsed, now)
    }

    #[test]
    fn test_time_ago_units() {
        assert_eq!(label(Duration::seconds(12)), "12s ago");
        assert_eq!(label(Duration::minutes(7)), "7m ago");
        assert_eq!(label(Duration::hours(4)), "4h ago");
        assert_eq!(label(Duration::days(5)), "5d ago");
        assert_eq!(label(Duration::days(65)), "2mo ago");
        assert_eq!(label(Duration::days(3 * 365 + 10)), "3y ago");
    }

    #[test]
    fn test_exactly_one_unit_falls_through() {
        // 恰好60秒不大于1分钟
        assert_eq!(label(Duration::seconds(60)), "60s ago");
        assert_eq!(label(Duration::seconds(61)), "1m ago");
    }

    #[test]
    fn test_future_timestamp_clamps() {
        assert_eq!(label(Duration::seconds(-30)), "0s ago");
    }
}
