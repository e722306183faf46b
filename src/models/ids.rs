use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

macro_rules! identifier {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl AsRef<str>) -> Result<Self, AppError> {
                let trimmed = raw.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(
                        concat!($label, " cannot be empty").to_string(),
                    ));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(OrderId, "order id");
identifier!(AssignmentId, "assignment id");
identifier!(AccountId, "account id");
identifier!(EventId, "event id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_trimmed() {
        let id = OrderId::new("  o-1 ").unwrap();
        assert_eq!(id.as_str(), "o-1");
        assert_eq!(id, OrderId::new("o-1").unwrap());
    }

    #[test]
    fn blank_id_is_rejected() {
        let err = AccountId::new("   ").unwrap_err();
        assert_eq!(err, AppError::Validation("account id cannot be empty".to_string()));
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(AssignmentId::generate(), AssignmentId::generate());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = OrderId::new("o-42").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"o-42\"");
    }
}
