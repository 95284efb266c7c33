/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Render cents as a decimal string for log lines (`2050` → `"20.50"`)
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(2050), "20.50");
        assert_eq!(format_cents(-500), "-5.00");
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2024-01-01 in epoch millis
        assert!(now_millis() > 1_704_067_200_000);
    }
}
