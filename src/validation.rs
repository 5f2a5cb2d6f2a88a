use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Errors attached to individual form fields, in field order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, msg: impl Into<String>) {
        self.0.push((field, msg.into()));
    }

    /// Records the error from `check`, if any, against `field`.
    pub fn check(&mut self, field: &'static str, check: Result<(), String>) {
        if let Err(e) = check {
            self.push(field, e);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, msg)| msg.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, String)> {
        self.0.iter()
    }
}

pub fn is_ascii_no_spaces(username: &str) -> Result<(), String> {
    match !username.is_empty()
        && username.chars().all(|c| c.is_ascii() && !c.is_whitespace())
    {
        true => Ok(()),
        false => Err("should be an ascii string without spaces".to_string()),
    }
}

pub fn is_valid_email(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
        r#"^(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])$"#
    ).unwrap()
    });
    match RE.is_match(string) {
        true => Ok(()),
        false => Err("invalid email".to_string()),
    }
}

/// Empty, or up to 15 digits with an optional leading `+`.
pub fn is_valid_phone(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\+?[0-9]{1,15}$").unwrap());
    match string.is_empty() || RE.is_match(string) {
        true => Ok(()),
        false => Err("should be up to 15 digits, optionally starting with +"
            .to_string()),
    }
}

pub fn is_valid_room_number(string: &str) -> Result<(), String> {
    match (1..=10).contains(&string.len())
        && string.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        true => Ok(()),
        false => Err(
            "should be 1 to 10 letters, digits or dashes".to_string(),
        ),
    }
}

pub fn max_len(max: usize) -> impl Fn(&str) -> Result<(), String> {
    move |string| match string.chars().count() <= max {
        true => Ok(()),
        false => Err(format!("must be at most {max} characters")),
    }
}

pub fn parse_date(string: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(string.trim(), "%Y-%m-%d")
        .map_err(|_| "enter a date as YYYY-MM-DD".to_string())
}

/// Parses any integer. An empty field takes `default` when one is given.
pub fn parse_whole(string: &str, default: Option<i64>) -> Result<i64, String> {
    let string = string.trim();
    if string.is_empty()
        && let Some(default) = default
    {
        return Ok(default);
    }
    string
        .parse::<i64>()
        .map_err(|_| "must be a whole number".to_string())
}

/// Parses an integer in `min..=max`. An empty field takes `default` when one
/// is given.
pub fn parse_bounded(
    string: &str,
    min: i64,
    max: i64,
    default: Option<i64>,
) -> Result<i64, String> {
    match parse_whole(string, default) {
        Ok(n) if (min..=max).contains(&n) => Ok(n),
        _ => Err(format!("must be a whole number from {min} to {max}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("hello@example.com").is_ok());
        assert!(is_valid_email("not an email").is_err());
    }

    #[test]
    fn phone_numbers() {
        assert!(is_valid_phone("").is_ok());
        assert!(is_valid_phone("+441234567890").is_ok());
        assert!(is_valid_phone("0123 456").is_err());
        assert!(is_valid_phone("1234567890123456").is_err());
    }

    #[test]
    fn room_numbers() {
        assert!(is_valid_room_number("101").is_ok());
        assert!(is_valid_room_number("B-12").is_ok());
        assert!(is_valid_room_number("").is_err());
        assert!(is_valid_room_number("12345678901").is_err());
    }

    #[test]
    fn bounded_numbers() {
        assert_eq!(parse_bounded("", 1, 6, Some(1)), Ok(1));
        assert_eq!(parse_bounded(" 4 ", 0, 4, None), Ok(4));
        assert!(parse_bounded("", 1, 6, None).is_err());
        assert!(parse_bounded("7", 1, 6, Some(1)).is_err());
        assert!(parse_bounded("two", 1, 6, Some(1)).is_err());
    }

    #[test]
    fn whole_numbers_have_no_range() {
        assert_eq!(parse_whole("0", None), Ok(0));
        assert_eq!(parse_whole(" -3 ", None), Ok(-3));
        assert_eq!(parse_whole("", Some(0)), Ok(0));
        assert!(parse_whole("", None).is_err());
        assert!(parse_whole("1.5", None).is_err());
    }

    #[test]
    fn field_errors_keep_the_first_message_per_field() {
        let mut errors = FieldErrors::new();
        errors.check("username", is_ascii_no_spaces("two words"));
        errors.check("email", is_valid_email("a@b.com"));
        errors.push("username", "taken");
        assert_eq!(
            errors.get("username"),
            Some("should be an ascii string without spaces")
        );
        assert_eq!(errors.get("email"), None);
        assert!(!errors.is_empty());
    }
}
