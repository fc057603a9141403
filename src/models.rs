use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interview,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "applied",
            JobStatus::Interview => "interview",
            JobStatus::Offer => "offer",
            JobStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Invalid status '{}'. Expected one of: applied, interview, offer, rejected",
                    s
                )
            })
    }
}

/// One tracked job application. Field names serialize in camelCase so the
/// persisted payload keeps the `appliedDate` layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    pub status: JobStatus,
    pub applied_date: NaiveDate,
}

/// Caller-supplied fields for a new record. `id`, `status` and the applied
/// date are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub company: String,
    pub role: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
}

impl NewJob {
    pub fn new(company: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            role: role.into(),
            ..Default::default()
        }
    }
}

/// Transient tips display slot, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipsResult {
    pub for_record_id: String,
    pub text: String,
    pub loading: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        for status in JobStatus::ALL {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert_eq!("Interview".parse::<JobStatus>().unwrap(), JobStatus::Interview);
        assert!("ghosted".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_record_json_layout() {
        let record = JobRecord {
            id: "1".to_string(),
            company: "Acme".to_string(),
            role: "Engineer".to_string(),
            location: String::new(),
            salary: String::new(),
            url: String::new(),
            notes: String::new(),
            status: JobStatus::Offer,
            applied_date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["appliedDate"], "2024-03-09");
        assert_eq!(json["status"], "offer");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let raw = r#"{"id":"1","company":"A","role":"B","status":"ghosted","appliedDate":"2024-01-01"}"#;
        assert!(serde_json::from_str::<JobRecord>(raw).is_err());
    }

    #[test]
    fn test_optional_fields_default_to_empty() {
        let raw = r#"{"id":"1","company":"A","role":"B","status":"applied","appliedDate":"2024-01-01"}"#;
        let record: JobRecord = serde_json::from_str(raw).unwrap();
        assert!(record.location.is_empty());
        assert!(record.notes.is_empty());
    }
}
