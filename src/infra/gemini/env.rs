use std::time::Duration;

use crate::domain::GenerationError;

pub(crate) fn read_env_var(name: &str) -> Result<Option<String>, GenerationError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(GenerationError::validation(format!(
            "{name} could not be read: {error}"
        ))),
    }
}

/// Returns the first variable in `names` that is set, in order.
pub(crate) fn read_first_env_var(names: &[&str]) -> Result<Option<String>, GenerationError> {
    read_first_with(names, read_env_var)
}

fn read_first_with<F>(names: &[&str], mut read: F) -> Result<Option<String>, GenerationError>
where
    F: FnMut(&str) -> Result<Option<String>, GenerationError>,
{
    for name in names {
        if let Some(value) = read(name)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

pub(crate) fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration, GenerationError> {
    let parsed = value.trim().parse::<u64>().map_err(|_| {
        GenerationError::validation(format!("{name} must be a positive integer in seconds"))
    })?;
    if parsed == 0 {
        return Err(GenerationError::validation(format!(
            "{name} must be greater than 0 seconds"
        )));
    }
    Ok(Duration::from_secs(parsed))
}

pub(crate) fn read_timeout_from_env(name: &str) -> Result<Option<Duration>, GenerationError> {
    let Some(value) = read_env_var(name)? else {
        return Ok(None);
    };
    Ok(Some(parse_timeout_seconds(name, &value)?))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use crate::domain::GenerationError;

    use super::{parse_timeout_seconds, read_first_with};

    #[test]
    fn parse_timeout_seconds_accepts_positive_integer_values() {
        let timeout = parse_timeout_seconds("TEST_TIMEOUT", " 90 ")
            .expect("positive integer timeout should parse");
        assert_eq!(timeout, Duration::from_secs(90));
    }

    #[test]
    fn parse_timeout_seconds_rejects_invalid_values() {
        let zero = parse_timeout_seconds("TEST_TIMEOUT", "0")
            .expect_err("zero timeout should fail validation");
        assert!(matches!(
            zero,
            GenerationError::Validation { message }
            if message == "TEST_TIMEOUT must be greater than 0 seconds"
        ));

        let invalid = parse_timeout_seconds("TEST_TIMEOUT", "abc")
            .expect_err("non-integer timeout should fail validation");
        assert!(matches!(
            invalid,
            GenerationError::Validation { message }
            if message == "TEST_TIMEOUT must be a positive integer in seconds"
        ));
    }

    #[test]
    fn read_first_with_stops_at_first_present_value() {
        let visited = RefCell::new(Vec::new());

        let value = read_first_with(&["PRIMARY", "FALLBACK", "LAST"], |name| {
            visited.borrow_mut().push(name.to_string());
            Ok((name == "FALLBACK").then(|| "key-from-fallback".to_string()))
        })
        .expect("lookup should succeed");

        assert_eq!(value.as_deref(), Some("key-from-fallback"));
        assert_eq!(*visited.borrow(), vec!["PRIMARY", "FALLBACK"]);
    }

    #[test]
    fn read_first_with_returns_none_when_nothing_is_set() {
        let value = read_first_with(&["A", "B"], |_| Ok(None)).expect("lookup should succeed");
        assert_eq!(value, None);
    }

    #[test]
    fn read_first_with_propagates_read_errors() {
        let error = read_first_with(&["BROKEN"], |_| {
            Err(GenerationError::validation("BROKEN could not be read"))
        })
        .expect_err("read errors should propagate");
        assert!(matches!(error, GenerationError::Validation { .. }));
    }
}
