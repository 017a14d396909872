//! Field presence checks.
//!
//! Plain substring tests over the extracted text. Everything is
//! case-sensitive except the signature check. A field that fails its test is
//! `Missing`, except the signature, which is flagged as a `Problem`.

use audittrack_config::FieldsConfig;
use audittrack_core::{AuditField, FieldStatus, FieldStatusMap};
use chrono::{Datelike, Utc};

/// Token lists the checks match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    pub date_tokens: Vec<String>,
    pub vendor_suffixes: Vec<String>,
}

impl FieldRules {
    pub fn new(date_tokens: Vec<String>, vendor_suffixes: Vec<String>) -> Self {
        Self {
            date_tokens,
            vendor_suffixes,
        }
    }

    /// `current_year` and the three years before it.
    pub fn recent_years(current_year: i32) -> Vec<String> {
        (current_year - 3..=current_year).map(|y| y.to_string()).collect()
    }

    pub fn from_config(config: &FieldsConfig) -> Self {
        let date_tokens = if config.date_tokens.is_empty() {
            Self::recent_years(Utc::now().year())
        } else {
            config.date_tokens.clone()
        };
        Self::new(date_tokens, config.vendor_suffixes.clone())
    }
}

impl Default for FieldRules {
    fn default() -> Self {
        Self::from_config(&FieldsConfig::default())
    }
}

fn present(found: bool) -> FieldStatus {
    if found {
        FieldStatus::Complete
    } else {
        FieldStatus::Missing
    }
}

/// Judge every audit field against `text`. Pure and total.
pub fn check_fields(text: &str, rules: &FieldRules) -> FieldStatusMap {
    let status = FieldStatusMap::from_fn(|field| match field {
        AuditField::Date => present(rules.date_tokens.iter().any(|t| text.contains(t.as_str()))),
        AuditField::VendorName => {
            present(rules.vendor_suffixes.iter().any(|s| text.contains(s.as_str())))
        }
        AuditField::TotalAmount => present(text.contains('$') || text.contains("USD")),
        AuditField::AccountCode => present(text.contains("Account Code:")),
        AuditField::DepartmentOrProject => present(text.contains("Department or Project:")),
        AuditField::SignaturePresent => {
            if text.to_lowercase().contains("signature") {
                FieldStatus::Complete
            } else {
                FieldStatus::Problem
            }
        }
    });
    tracing::debug!(issues = status.issue_count(), "Field check complete");
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use AuditField::*;
    use FieldStatus::*;

    fn rules() -> FieldRules {
        FieldRules::new(
            FieldRules::recent_years(2025),
            vec!["LLC".into(), "Inc".into(), "Corp".into()],
        )
    }

    #[test]
    fn recent_years_covers_four_years() {
        assert_eq!(FieldRules::recent_years(2025), vec!["2022", "2023", "2024", "2025"]);
    }

    #[test]
    fn empty_config_uses_recent_years() {
        let rules = FieldRules::from_config(&FieldsConfig::default());
        assert_eq!(rules.date_tokens.len(), 4);
        assert_eq!(rules.date_tokens[3], Utc::now().year().to_string());

        let pinned = FieldRules::from_config(&FieldsConfig {
            date_tokens: vec!["FY2019".into()],
            ..FieldsConfig::default()
        });
        assert_eq!(pinned.date_tokens, vec!["FY2019"]);
    }

    /// (field, text, expected) for every branch of every rule.
    #[test]
    fn every_field_every_branch() {
        let table: &[(AuditField, &str, FieldStatus)] = &[
            (Date, "Issued 2024-03-01", Complete),
            (Date, "Issued 2022", Complete),
            (Date, "Issued 2019", Missing),
            (Date, "", Missing),
            (VendorName, "Acme LLC", Complete),
            (VendorName, "Acme Inc.", Complete),
            (VendorName, "Acme Corp", Complete),
            (VendorName, "Acme llc", Missing),
            (VendorName, "Acme Partners", Missing),
            (TotalAmount, "Total: $1,200.00", Complete),
            (TotalAmount, "Total: 1200 USD", Complete),
            (TotalAmount, "Total: 1200 usd", Missing),
            (TotalAmount, "Total: 1200", Missing),
            (AccountCode, "Account Code: 4410", Complete),
            (AccountCode, "account code: 4410", Missing),
            (AccountCode, "Account Code 4410", Missing),
            (DepartmentOrProject, "Department or Project: Roads", Complete),
            (DepartmentOrProject, "Department: Roads", Missing),
            (SignaturePresent, "Signature: J. Doe", Complete),
            (SignaturePresent, "SIGNATURE ON FILE", Complete),
            (SignaturePresent, "signed by J. Doe", Problem),
            (SignaturePresent, "", Problem),
        ];

        for (field, text, expected) in table {
            let status = check_fields(text, &rules());
            assert_eq!(status.get(*field), *expected, "{field} on {text:?}");
        }
    }

    #[test]
    fn every_field_appears_once_and_only_signature_is_a_problem() {
        for text in ["", "anything", "Signature 2024 LLC $", "Account Code: Department or Project:"] {
            let status = check_fields(text, &rules());
            assert_eq!(status.len(), AuditField::ALL.len());
            let fields: Vec<_> = status.iter().map(|(f, _)| f).collect();
            assert_eq!(fields, AuditField::ALL.to_vec());
            for (field, value) in status.iter() {
                if value == Problem {
                    assert_eq!(field, SignaturePresent);
                }
            }
        }
    }

    #[test]
    fn acme_invoice() {
        let text = "Invoice dated 2024 from Acme Inc for $500, no signature included, Account Code: 4410.";
        let status = check_fields(text, &rules());

        assert_eq!(status.get(Date), Complete);
        assert_eq!(status.get(VendorName), Complete);
        assert_eq!(status.get(TotalAmount), Complete);
        assert_eq!(status.get(AccountCode), Complete);
        assert_eq!(status.get(DepartmentOrProject), Missing);
        // The word "signature" appears, so the substring check passes.
        assert_eq!(status.get(SignaturePresent), Complete);
        assert_eq!(status.issue_count(), 1);
    }

    #[test]
    fn unsigned_invoice_is_flagged() {
        let status = check_fields("Invoice dated 2024 from Acme Inc for $500", &rules());
        assert_eq!(status.get(SignaturePresent), Problem);
        assert_eq!(status.issue_count(), 3);
    }
}
