//! Cron expression parsing — 5-field (minute precision), 6-field (second
//! precision), and the named mnemonics, all normalized onto the
//! `cron` crate's native 6-field (`sec min hour dom month dow`) syntax
//! (spec §4.1, §6).

use std::str::FromStr;

use cron::Schedule;

use crate::error::CronError;

fn mnemonic_to_expr(mnemonic: &str) -> Option<&'static str> {
    match mnemonic {
        "@yearly" | "@annually" => Some("0 0 0 1 1 *"),
        "@monthly" => Some("0 0 0 1 * *"),
        "@weekly" => Some("0 0 0 * * 0"),
        "@daily" | "@midnight" => Some("0 0 0 * * *"),
        "@hourly" => Some("0 0 * * * *"),
        _ => None,
    }
}

/// Parse a cron expression into a [`Schedule`].
///
/// Accepts 5-field (`minute hour dom month dow`, seconds implied as `0`),
/// 6-field (`second minute hour dom month dow`), or one of the mnemonics
/// listed in spec §4.1. Anything else is rejected with the field count
/// that was actually supplied, so the caller can see the mismatch.
pub fn parse(expr: &str) -> Result<Schedule, CronError> {
    let trimmed = expr.trim();

    if let Some(normalized) = mnemonic_to_expr(trimmed) {
        return Schedule::from_str(normalized).map_err(|e| CronError::InvalidExpression {
            expr: expr.to_string(),
            field_count: 1,
            reason: e.to_string(),
        });
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();

    let normalized = match fields.len() {
        5 => format!("0 {trimmed}"),
        6 | 7 => trimmed.to_string(),
        other => {
            return Err(CronError::InvalidExpression {
                expr: expr.to_string(),
                field_count: other,
                reason: "expected 5 fields (minute precision), 6 fields (second precision), \
                         or a named mnemonic"
                    .to_string(),
            });
        }
    };

    Schedule::from_str(&normalized).map_err(|e| CronError::InvalidExpression {
        expr: expr.to_string(),
        field_count: fields.len(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn five_field_expression_parses_at_minute_precision() {
        let schedule = parse("*/1 * * * *").unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }

    #[test]
    fn six_field_expression_parses_at_second_precision() {
        let schedule = parse("0 */1 * * * *").unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }

    #[test]
    fn mnemonics_parse() {
        for m in ["@hourly", "@daily", "@weekly", "@monthly", "@yearly", "@midnight", "@annually"] {
            assert!(parse(m).is_ok(), "{m} should parse");
        }
    }

    #[test]
    fn wrong_field_count_is_rejected_with_count() {
        let err = parse("* * *").unwrap_err();
        match err {
            CronError::InvalidExpression { field_count, .. } => assert_eq!(field_count, 3),
            _ => panic!("expected InvalidExpression"),
        }
    }
}
