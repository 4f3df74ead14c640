use chrono::{DateTime, Local, Utc};

/// 当前时间的毫秒时间戳
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// 将时间格式化为本地时间 HH:MM:SS.mmm
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        let a = now_millis();
        let b = now_millis();
        assert!(a > 1_600_000_000_000);
        assert!(b >= a);
    }

    #[test]
    fn test_format_timestamp_shape() {
        let formatted = format_timestamp(Utc::now());
        assert_eq!(formatted.len(), 12);
        assert_eq!(&formatted[2..3], ":");
        assert_eq!(&formatted[8..9], ".");
    }
}
