//! Small validators shared by configuration checks.

use std::ops::RangeInclusive;

/// Validates that a port number is not 0, which is reserved.
///
/// # Returns
///
/// * `Ok(())` if the port is valid.
/// * `Err(&'static str)` if the port is invalid.
pub fn is_valid_port(port: u16) -> Result<(), &'static str> {
    if port > 0 {
        Ok(())
    } else {
        Err("Port number must be greater than 0")
    }
}

/// Validates that a host is non-empty and contains no whitespace.
///
/// Hostnames are accepted as well as IP addresses; whether they resolve is
/// checked when connecting.
pub fn is_valid_host(host: &str) -> Result<(), &'static str> {
    if host.is_empty() {
        return Err("Host cannot be empty");
    }
    if host.chars().any(char::is_whitespace) {
        return Err("Host cannot contain whitespace");
    }
    Ok(())
}

/// Validates if a given value is within a specified numeric range.
///
/// # Returns
///
/// * `Ok(())` if the value is within the range.
/// * `Err(&'static str)` if the value is outside the range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates that `value` is one of `allowed`, ignoring ASCII case.
pub fn is_one_of(value: &str, allowed: &[&str]) -> Result<(), String> {
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        Err(format!(
            "'{}' is not one of: {}",
            value,
            allowed.join(", ")
        ))
    }
}
