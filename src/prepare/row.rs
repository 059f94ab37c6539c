//! Extraction of bucket pairs from CSV rows.
//!
//! Column names are free-form; fields are located by looking for keywords
//! within each (lowercased) header, in a fixed order of precedence.
use csv::StringRecord;

use crate::config::Side;
use crate::types::{UtilError, UtilResult};

/// Field of a bucket pair which a column may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Endpoint,
    Bucket,
    User,
    Group,
}

impl Field {
    /// Keyword which identifies the field within a column name.
    fn keyword(self) -> &'static str {
        match self {
            Field::Endpoint => "endpoint",
            Field::Bucket => "bucket",
            Field::User => "user",
            Field::Group => "group",
        }
    }
}

/// Order in which column rules are attempted; the first match wins.
const RULES: [(Side, Field); 8] = [
    (Side::Source, Field::Endpoint),
    (Side::Source, Field::Bucket),
    (Side::Source, Field::User),
    (Side::Source, Field::Group),
    (Side::Target, Field::Endpoint),
    (Side::Target, Field::Bucket),
    (Side::Target, Field::User),
    (Side::Target, Field::Group),
];

/// Matches a column name against the rules, returning the first hit.
pub fn classify(column: &str) -> Option<(Side, Field)> {
    let column = column.to_ascii_lowercase();
    RULES
        .iter()
        .copied()
        .find(|(side, field)| column.contains(side.as_str()) && column.contains(field.keyword()))
}

/// Normalizes a raw CSV value by dropping non-ASCII characters and trimming.
pub fn clean(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Raw, possibly incomplete, values for one side of a row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawSide {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub user: Option<String>,
    pub group: Option<String>,
}

impl RawSide {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Endpoint => &mut self.endpoint,
            Field::Bucket => &mut self.bucket,
            Field::User => &mut self.user,
            Field::Group => &mut self.group,
        };
        *slot = Some(value);
    }

    /// Validates presence of every field and derives the region.
    pub fn into_location(self, side: Side, row: usize) -> UtilResult<Location> {
        let missing = |name: &str| {
            UtilError::data(format!("row {} is missing the {} {}", row, side, name))
        };

        let endpoint = self.endpoint.ok_or_else(|| missing("endpoint"))?;
        let bucket = self.bucket.ok_or_else(|| missing("bucket"))?;
        let user = self.user.ok_or_else(|| missing("user"))?;
        let group = self.group.ok_or_else(|| missing("group"))?;
        let region = region_token(&endpoint)?;

        Ok(Location {
            endpoint,
            region,
            bucket,
            user,
            group,
        })
    }
}

/// Raw values of a single CSV row, split by side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRow {
    pub source: RawSide,
    pub target: RawSide,
}

impl RawRow {
    /// Collects the recognised, non-blank values from a CSV record.
    pub fn from_record(headers: &StringRecord, record: &StringRecord) -> Self {
        let mut row = RawRow::default();

        for (column, value) in headers.iter().zip(record.iter()) {
            let value = clean(value);
            if value.is_empty() {
                continue;
            }

            if let Some((side, field)) = classify(&clean(column)) {
                let raw = match side {
                    Side::Source => &mut row.source,
                    Side::Target => &mut row.target,
                };
                raw.set(field, value);
            }
        }

        row
    }
}

/// Fully validated location of one side of a bucket pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub user: String,
    pub group: String,
}

/// Derives the region token from an S3 endpoint hostname.
///
/// The token is the second dash-separated segment of the first label of
/// the hostname, so `s3-us-east-1.example.com` yields `us`.
pub fn region_token(endpoint: &str) -> UtilResult<String> {
    endpoint
        .split('.')
        .next()
        .and_then(|label| label.split('-').nth(1))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            UtilError::data(format!(
                "unable to derive a region from endpoint '{}'",
                endpoint
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: &[&str]) -> StringRecord {
        StringRecord::from(values.to_vec())
    }

    #[test]
    fn deriving_region_tokens() {
        assert_eq!(region_token("s3-us-east-1.example.com").unwrap(), "us");
        assert_eq!(region_token("s3-eu-west-1.example.com").unwrap(), "eu");
        assert_eq!(region_token("s3-tokyo").unwrap(), "tokyo");
    }

    #[test]
    fn rejecting_endpoints_without_region() {
        assert!(region_token("s3.example.com").is_err());
        assert!(region_token("s3-.example.com").is_err());
        assert!(region_token("").is_err());
    }

    #[test]
    fn classifying_columns() {
        assert_eq!(
            classify("Source S3 Endpoint"),
            Some((Side::Source, Field::Endpoint))
        );
        assert_eq!(
            classify("Target_Bucket_Name"),
            Some((Side::Target, Field::Bucket))
        );
        assert_eq!(
            classify("SOURCE_GROUP"),
            Some((Side::Source, Field::Group))
        );
        assert_eq!(classify("notes"), None);
        assert_eq!(classify("bucket"), None);
    }

    #[test]
    fn classifying_ambiguous_columns_by_precedence() {
        // endpoint beats bucket, bucket beats user, user beats group
        assert_eq!(
            classify("source_bucket_endpoint"),
            Some((Side::Source, Field::Endpoint))
        );
        assert_eq!(
            classify("source_user_bucket"),
            Some((Side::Source, Field::Bucket))
        );
        assert_eq!(
            classify("source_usergroup"),
            Some((Side::Source, Field::User))
        );
        // source rules are all attempted before target rules
        assert_eq!(
            classify("target_bucket_of_source_user"),
            Some((Side::Source, Field::Bucket))
        );
    }

    #[test]
    fn cleaning_values() {
        assert_eq!(clean("  photos \t"), "photos");
        assert_eq!(clean("\u{feff}Source Bucket"), "Source Bucket");
        assert_eq!(clean("caf\u{e9}"), "caf");
    }

    #[test]
    fn collecting_row_values() {
        let headers = record(&[
            "\u{feff}Source Endpoint",
            "Source Bucket",
            "Source User",
            "Source Group",
            "Target Endpoint",
            "Target Bucket",
            "Target User",
            "Target Group",
            "Comment",
        ]);
        let values = record(&[
            "s3-us-east-1.example.com",
            " photos ",
            "alice",
            "analytics",
            "s3-eu-west-1.example.com",
            "photos-copy",
            "bob",
            "",
            "ignored",
        ]);

        let row = RawRow::from_record(&headers, &values);

        assert_eq!(
            row.source.endpoint.as_deref(),
            Some("s3-us-east-1.example.com")
        );
        assert_eq!(row.source.bucket.as_deref(), Some("photos"));
        assert_eq!(row.target.user.as_deref(), Some("bob"));
        assert_eq!(row.target.group, None);
    }

    #[test]
    fn validating_complete_sides() {
        let raw = RawSide {
            endpoint: Some("s3-us-east-1.example.com".to_string()),
            bucket: Some("photos".to_string()),
            user: Some("alice".to_string()),
            group: Some("analytics".to_string()),
        };

        let location = raw.into_location(Side::Source, 1).unwrap();

        assert_eq!(location.region, "us");
        assert_eq!(location.bucket, "photos");
    }

    #[test]
    fn rejecting_incomplete_sides() {
        let raw = RawSide {
            endpoint: Some("s3-us-east-1.example.com".to_string()),
            bucket: Some("photos".to_string()),
            user: Some("alice".to_string()),
            group: None,
        };

        let err = raw.into_location(Side::Target, 3).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid input data: row 3 is missing the target group"
        );
    }

    #[test]
    fn rejecting_sides_without_endpoint() {
        let raw = RawSide {
            endpoint: None,
            bucket: Some("photos".to_string()),
            user: Some("alice".to_string()),
            group: Some("analytics".to_string()),
        };

        assert!(raw.into_location(Side::Source, 1).is_err());
    }
}
