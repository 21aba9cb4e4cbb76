//! Configuration validation.
//!
//! Validates all config fields before any collaborator is contacted.

use crate::domain::error::DualmomError;
use crate::domain::order::TimeInForce;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    validate_assets(config)?;
    validate_lookback(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_execution_config(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    validate_capital_fraction(config)?;
    validate_time_in_force(config)?;
    validate_run_after_hour(config)?;
    flag(config, "execution", "strict_universe", false)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => {
            if config
                .get_string("data", "csv_dir")
                .filter(|s| !s.trim().is_empty())
                .is_none()
            {
                return Err(DualmomError::ConfigMissing {
                    section: "data".to_string(),
                    key: "csv_dir".to_string(),
                });
            }
            Ok(())
        }
        "alpaca" => {
            let delay = typed::<i64>(config, "alpaca", "request_delay_ms", 250)?;
            if delay < 0 {
                return Err(DualmomError::config_invalid(
                    "alpaca",
                    "request_delay_ms",
                    "request_delay_ms must not be negative",
                ));
            }
            Ok(())
        }
        other => Err(DualmomError::config_invalid(
            "data",
            "source",
            format!("unknown source '{other}' (expected csv or alpaca)"),
        )),
    }
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let a = config.get_string("strategy", "asset_a");
    let b = config.get_string("strategy", "asset_b");
    for (key, value) in [("asset_a", &a), ("asset_b", &b)] {
        if let Some(v) = value {
            if v.trim().is_empty() {
                return Err(DualmomError::config_invalid(
                    "strategy",
                    key,
                    "symbol must not be empty",
                ));
            }
        }
    }
    let a = a.unwrap_or_else(|| "SPY".to_string());
    let b = b.unwrap_or_else(|| "QQQ".to_string());
    if a.trim().eq_ignore_ascii_case(b.trim()) {
        return Err(DualmomError::config_invalid(
            "strategy",
            "asset_b",
            "asset_a and asset_b must differ",
        ));
    }
    Ok(())
}

/// Token set shared with the INI adapter's `get_bool`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// The typed `ConfigPort` getters fall back to their default on a value
/// that does not parse; validation reads the raw text so a typo fails.
fn typed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, DualmomError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            DualmomError::config_invalid(section, key, format!("cannot parse '{raw}'"))
        }),
    }
}

fn flag(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, DualmomError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| {
            DualmomError::config_invalid(section, key, format!("'{raw}' is not a boolean"))
        }),
    }
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = typed::<i64>(config, "strategy", "lookback", 63)?;
    if value <= 0 {
        return Err(DualmomError::config_invalid(
            "strategy",
            "lookback",
            "lookback must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = typed::<f64>(config, "strategy", "risk_free_rate", 0.02)?;
    if !(0.0..1.0).contains(&value) {
        return Err(DualmomError::config_invalid(
            "strategy",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let start_str = config.get_string("strategy", "start_date");
    let start_date = parse_date(start_str.as_deref(), "start_date")?;

    if let Some(end_str) = config.get_string("strategy", "end_date") {
        let end_date = parse_date(Some(&end_str), "end_date")?;
        if start_date >= end_date {
            return Err(DualmomError::config_invalid(
                "strategy",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, key: &str) -> Result<NaiveDate, DualmomError> {
    let value = value.ok_or_else(|| DualmomError::ConfigMissing {
        section: "strategy".to_string(),
        key: key.to_string(),
    })?;
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        DualmomError::config_invalid(
            "strategy",
            key,
            "invalid date format (expected YYYY-MM-DD)",
        )
    })
}

fn validate_capital_fraction(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = typed::<f64>(config, "execution", "capital_fraction", 0.10)?;
    if !(value > 0.0 && value <= 1.0) {
        return Err(DualmomError::config_invalid(
            "execution",
            "capital_fraction",
            "capital_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_time_in_force(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    if let Some(value) = config.get_string("execution", "time_in_force") {
        value
            .parse::<TimeInForce>()
            .map_err(|reason| DualmomError::config_invalid("execution", "time_in_force", reason))?;
    }
    Ok(())
}

fn validate_run_after_hour(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = typed::<i64>(config, "execution", "run_after_hour", 16)?;
    if !(0..=23).contains(&value) {
        return Err(DualmomError::config_invalid(
            "execution",
            "run_after_hour",
            "run_after_hour must be between 0 and 23",
        ));
    }
    Ok(())
}
