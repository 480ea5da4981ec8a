// Five-field cron patterns as the dcron API expects them.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// `minute hour dom month dow`, validated by field count only. The server
/// owns the meaning of each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronPattern {
    pub minute: String,
    pub hour: String,
    pub dom: String,
    pub month: String,
    pub dow: String,
}

impl FromStr for CronPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_whitespace().collect::<Vec<_>>().as_slice() {
            [minute, hour, dom, month, dow] => Ok(CronPattern {
                minute: minute.to_string(),
                hour: hour.to_string(),
                dom: dom.to_string(),
                month: month.to_string(),
                dow: dow.to_string(),
            }),
            _ => Err(Error::InvalidPattern(s.to_string())),
        }
    }
}

impl fmt::Display for CronPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.dom, self.month, self.dow
        )
    }
}

impl CronPattern {
    /// Form body identifying a job: the command plus one field per
    /// pattern component.
    pub fn form_fields<'a>(&'a self, command: &'a str) -> Vec<(&'static str, &'a str)> {
        vec![
            ("command", command),
            ("minute", self.minute.as_str()),
            ("hour", self.hour.as_str()),
            ("dom", self.dom.as_str()),
            ("month", self.month.as_str()),
            ("dow", self.dow.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_five_fields() {
        let every_minute: CronPattern = "* * * * *".parse().unwrap();
        assert_eq!(every_minute.to_string(), "* * * * *");

        let nightly: CronPattern = "30 2 * * 1-5".parse().unwrap();
        assert_eq!(nightly.minute, "30");
        assert_eq!(nightly.hour, "2");
        assert_eq!(nightly.dow, "1-5");
    }

    #[test]
    fn rejects_other_field_counts() {
        for pattern in ["* * * *", "* * * * * *", "", "   "] {
            let err = pattern.parse::<CronPattern>().unwrap_err();
            assert!(matches!(err, Error::InvalidPattern(_)), "{pattern:?}");
            assert_eq!(err.exit_code(), 14);
        }
    }

    #[test]
    fn normalizes_spacing_for_display() {
        let pattern: CronPattern = " */5  *\t* * * ".parse().unwrap();
        assert_eq!(pattern.to_string(), "*/5 * * * *");
    }

    #[test]
    fn runs_of_whitespace_separate_fields() {
        for pattern in ["*  * * * *", "*\t*\t*\t*\t*", "* * * *  *  "] {
            let parsed: CronPattern = pattern.parse().unwrap();
            assert_eq!(parsed.to_string(), "* * * * *", "{pattern:?}");
        }
        assert!("*  * * *".parse::<CronPattern>().is_err());
    }

    #[test]
    fn form_fields_follow_api_names() {
        let pattern: CronPattern = "1 2 3 4 5".parse().unwrap();
        assert_eq!(
            pattern.form_fields("backup.sh"),
            vec![
                ("command", "backup.sh"),
                ("minute", "1"),
                ("hour", "2"),
                ("dom", "3"),
                ("month", "4"),
                ("dow", "5"),
            ]
        );
    }
}
