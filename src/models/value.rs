use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AppError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("address cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Total parcel weight. Unit-agnostic, must be finite and >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Weight(f64);

impl Weight {
    pub fn new(value: f64) -> Result<Self, AppError> {
        if !value.is_finite() {
            return Err(AppError::Validation("weight must be a finite number".to_string()));
        }
        if value < 0.0 {
            return Err(AppError::Validation("weight cannot be negative".to_string()));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, AppError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::Validation(
                    "time window start must not be after its end".to_string(),
                ));
            }
        }
        Ok(Self { start, end })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AppError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trims free text; blank input collapses to `None`.
pub fn normalize_optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn address_is_trimmed_and_compared_by_value() {
        let a = Address::new("  12 Dock Street ").unwrap();
        assert_eq!(a.as_str(), "12 Dock Street");
        assert_eq!(a, Address::new("12 Dock Street").unwrap());
        assert_ne!(a, Address::new("13 Dock Street").unwrap());
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(matches!(Address::new(" \t"), Err(AppError::Validation(_))));
    }

    #[test]
    fn weight_rejects_negative_and_nan() {
        assert!(Weight::new(-0.1).is_err());
        assert!(Weight::new(f64::NAN).is_err());
        assert!(Weight::new(f64::INFINITY).is_err());
        assert_eq!(Weight::new(0.0).unwrap(), Weight::zero());
        assert_eq!(Weight::new(5.0).unwrap().value(), 5.0);
    }

    #[test]
    fn time_window_requires_ordered_bounds() {
        let now = Utc::now();
        let later = now + Duration::hours(2);

        assert!(TimeWindow::new(Some(now), Some(later)).is_ok());
        assert!(TimeWindow::new(Some(now), Some(now)).is_ok());
        assert!(TimeWindow::new(Some(later), Some(now)).is_err());
        assert!(TimeWindow::new(Some(later), None).is_ok());
        assert!(TimeWindow::new(None, Some(now)).is_ok());
    }

    #[test]
    fn blank_notes_collapse_to_none() {
        assert_eq!(normalize_optional_text(Some("   ".to_string())), None);
        assert_eq!(
            normalize_optional_text(Some(" fragile ".to_string())),
            Some("fragile".to_string())
        );
        assert_eq!(normalize_optional_text(None), None);
    }

    #[test]
    fn account_name_must_not_be_blank() {
        assert!(AccountName::new("").is_err());
        assert_eq!(AccountName::new(" Ada ").unwrap().as_str(), "Ada");
    }
}
