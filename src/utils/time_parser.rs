//! 过期时间解析
//!
//! 支持三种输入：
//! - 预设：`1_day`、`1_week`、`1_month`、`3_months`、`1_year`、`never`
//! - 相对时间：`1h`、`30m`、`2d12h`、`1w`、`1y`
//! - RFC3339：`2030-01-01T00:00:00Z`

use chrono::{DateTime, Duration, Utc};
use strum::{AsRefStr, EnumIter, EnumString};

/// 过期预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
pub enum ExpiryPreset {
    #[strum(serialize = "1_day")]
    OneDay,
    #[strum(serialize = "1_week")]
    OneWeek,
    #[strum(serialize = "1_month")]
    OneMonth,
    #[strum(serialize = "3_months")]
    ThreeMonths,
    #[strum(serialize = "1_year")]
    OneYear,
    #[strum(serialize = "never")]
    Never,
}

impl ExpiryPreset {
    /// 预设对应的时长，`Never` 返回 None
    pub fn duration(self) -> Option<Duration> {
        match self {
            ExpiryPreset::OneDay => Some(Duration::days(1)),
            ExpiryPreset::OneWeek => Some(Duration::weeks(1)),
            ExpiryPreset::OneMonth => Some(Duration::days(30)),
            ExpiryPreset::ThreeMonths => Some(Duration::days(90)),
            ExpiryPreset::OneYear => Some(Duration::days(365)),
            ExpiryPreset::Never => None,
        }
    }
}

pub struct TimeParser;

impl TimeParser {
    /// 解析过期输入，返回绝对过期时间；`never` 返回 `Ok(None)`
    ///
    /// 结果不晚于 `now` 时报错。
    pub fn resolve_expiry(input: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("Expiry cannot be empty".to_string());
        }

        if let Ok(preset) = input.parse::<ExpiryPreset>() {
            return Ok(preset.duration().map(|d| now + d));
        }

        let expires_at = if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            dt.with_timezone(&Utc)
        } else {
            let duration = Self::parse_duration(input)?;
            now.checked_add_signed(duration)
                .ok_or_else(|| "Expiry is out of range".to_string())?
        };

        if expires_at <= now {
            return Err("Expiry must be in the future".to_string());
        }

        Ok(Some(expires_at))
    }

    /// 解析相对时长，例如 `1d2h30m`
    ///
    /// 单位：s、m（分钟）、h、d、w、M（30 天）、y（365 天）
    pub fn parse_duration(input: &str) -> Result<Duration, String> {
        let mut total = Duration::zero();
        let mut rest = input.trim();

        if rest.is_empty() {
            return Err("Duration cannot be empty".to_string());
        }

        while !rest.is_empty() {
            let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                return Err(format!("Invalid duration format: '{}'", input));
            }
            let num: i64 = rest[..digits]
                .parse()
                .map_err(|_| format!("Invalid number in duration: '{}'", &rest[..digits]))?;
            rest = &rest[digits..];

            let unit_len = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
            if unit_len == 0 {
                return Err(format!("Missing time unit after '{}'", num));
            }
            let unit = &rest[..unit_len];
            rest = &rest[unit_len..];

            let part = match unit {
                "M" | "mo" | "month" | "months" => num.checked_mul(30).map(Duration::days),
                _ => match unit.to_lowercase().as_str() {
                    "s" | "sec" | "second" | "seconds" => Duration::try_seconds(num),
                    "m" | "min" | "minute" | "minutes" => Duration::try_minutes(num),
                    "h" | "hour" | "hours" => Duration::try_hours(num),
                    "d" | "day" | "days" => Duration::try_days(num),
                    "w" | "week" | "weeks" => Duration::try_weeks(num),
                    "y" | "year" | "years" => num.checked_mul(365).and_then(Duration::try_days),
                    _ => return Err(format!("Unsupported time unit: '{}'", unit)),
                },
            }
            .ok_or_else(|| "Duration is out of range".to_string())?;

            total = total
                .checked_add(&part)
                .ok_or_else(|| "Duration is out of range".to_string())?;
        }

        if total == Duration::zero() {
            return Err("Duration cannot be zero".to_string());
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-17T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_presets() {
        let now = fixed_now();
        assert_eq!(
            TimeParser::resolve_expiry("1_day", now).unwrap(),
            Some(now + Duration::days(1))
        );
        assert_eq!(
            TimeParser::resolve_expiry("1_week", now).unwrap(),
            Some(now + Duration::days(7))
        );
        assert_eq!(
            TimeParser::resolve_expiry("1_month", now).unwrap(),
            Some(now + Duration::days(30))
        );
        assert_eq!(
            TimeParser::resolve_expiry("3_months", now).unwrap(),
            Some(now + Duration::days(90))
        );
        assert_eq!(
            TimeParser::resolve_expiry("1_year", now).unwrap(),
            Some(now + Duration::days(365))
        );
        assert_eq!(TimeParser::resolve_expiry("never", now).unwrap(), None);
    }

    #[test]
    fn test_relative_durations() {
        assert_eq!(
            TimeParser::parse_duration("1d2h30m").unwrap(),
            Duration::days(1) + Duration::hours(2) + Duration::minutes(30)
        );
        assert_eq!(TimeParser::parse_duration("30m").unwrap(), Duration::minutes(30));
        assert_eq!(TimeParser::parse_duration("2M").unwrap(), Duration::days(60));
        assert_eq!(TimeParser::parse_duration("1y").unwrap(), Duration::days(365));
        assert_eq!(TimeParser::parse_duration("1w").unwrap(), Duration::days(7));
    }

    #[test]
    fn test_invalid_durations() {
        assert!(TimeParser::parse_duration("").is_err());
        assert!(TimeParser::parse_duration("abc").is_err());
        assert!(TimeParser::parse_duration("10").is_err());
        assert!(TimeParser::parse_duration("5x").is_err());
        assert!(TimeParser::parse_duration("0d").is_err());
    }

    #[test]
    fn test_rfc3339() {
        let now = fixed_now();
        let at = TimeParser::resolve_expiry("2030-01-01T00:00:00Z", now)
            .unwrap()
            .unwrap();
        assert_eq!(at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_past_timestamp_rejected() {
        let now = fixed_now();
        assert!(TimeParser::resolve_expiry("2020-01-01T00:00:00Z", now).is_err());
        assert!(TimeParser::resolve_expiry("2026-10-17T12:00:00Z", now).is_err());
    }
}
