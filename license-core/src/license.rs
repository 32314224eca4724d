use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manager::LicenseManagementError;

/// The license bean that is encoded into license keys and stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    /// The product or feature the license is for. Must match the subject of
    /// the consuming manager.
    pub subject: String,
    pub holder: String,
    pub issuer: String,
    pub issued: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,
    /// E.g. `"User"` or `"System"`
    pub consumer_type: String,
    pub consumer_amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl License {
    /// A license for one user, valid from `issued` on, without expiry.
    pub fn new(
        subject: impl Into<String>,
        holder: impl Into<String>,
        issuer: impl Into<String>,
        issued: DateTime<Utc>,
    ) -> License {
        License {
            subject: subject.into(),
            holder: holder.into(),
            issuer: issuer.into(),
            issued,
            not_before: None,
            not_after: None,
            consumer_type: "User".to_owned(),
            consumer_amount: 1,
            info: None,
        }
    }

    /// Check that this license may be consumed for `subject` at time `now`.
    pub fn validate(&self, subject: &str, now: DateTime<Utc>) -> Result<(), LicenseManagementError> {
        if self.subject != subject {
            return Err(LicenseManagementError::SubjectMismatch {
                expected: subject.to_owned(),
                actual: self.subject.clone(),
            });
        }
        if self.consumer_amount == 0 {
            return Err(LicenseManagementError::Invalid(
                "consumer amount must be positive".to_owned(),
            ));
        }
        if let Some(not_before) = self.not_before {
            if now < not_before {
                return Err(LicenseManagementError::NotYetValid(not_before));
            }
        }
        if let Some(not_after) = self.not_after {
            if now > not_after {
                return Err(LicenseManagementError::Expired(not_after));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};

    use super::*;

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_validate_ok() {
        let mut license = License::new("payroll", "ACME Corp.", "Example Ltd.", issued());
        license.not_before = Some(issued());
        license.not_after = Some(issued() + Duration::days(30));
        license
            .validate("payroll", issued() + Duration::days(1))
            .unwrap();
        // Bounds are inclusive
        license.validate("payroll", issued()).unwrap();
        license
            .validate("payroll", issued() + Duration::days(30))
            .unwrap();
    }

    #[test]
    fn test_validate_subject_mismatch() {
        let license = License::new("payroll", "ACME Corp.", "Example Ltd.", issued());
        match license.validate("invoicing", issued()) {
            Err(LicenseManagementError::SubjectMismatch { expected, actual }) => {
                assert_eq!(expected, "invoicing");
                assert_eq!(actual, "payroll");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_validity_period() {
        let mut license = License::new("payroll", "ACME Corp.", "Example Ltd.", issued());
        license.not_before = Some(issued() + Duration::days(1));
        license.not_after = Some(issued() + Duration::days(2));
        assert!(matches!(
            license.validate("payroll", issued()),
            Err(LicenseManagementError::NotYetValid(t)) if t == issued() + Duration::days(1)
        ));
        assert!(matches!(
            license.validate("payroll", issued() + Duration::days(3)),
            Err(LicenseManagementError::Expired(_))
        ));
    }

    #[test]
    fn test_validate_zero_consumers() {
        let mut license = License::new("payroll", "ACME Corp.", "Example Ltd.", issued());
        license.consumer_amount = 0;
        assert!(matches!(
            license.validate("payroll", issued()),
            Err(LicenseManagementError::Invalid(_))
        ));
    }

    #[test]
    fn test_json_field_names() {
        let mut license = License::new("payroll", "ACME Corp.", "Example Ltd.", issued());
        license.not_after = Some(issued());
        let json = serde_json::to_value(&license).unwrap();
        assert_eq!(json["consumerType"], "User");
        assert_eq!(json["consumerAmount"], 1);
        assert_eq!(json["notAfter"], "2024-03-01T12:00:00Z");
        assert!(json.get("notBefore").is_none());
    }
}
