use chrono::{DateTime, Datelike, Utc};
use std::fmt::{self, Display, Formatter};

/// Year/month partition of a dated collection in S3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatePartition {
    pub year: i32,
    pub month: u32,
}

impl From<DateTime<Utc>> for DatePartition {
    fn from(date_time: DateTime<Utc>) -> Self {
        DatePartition {
            year: date_time.year(),
            month: date_time.month(),
        }
    }
}

impl DatePartition {
    pub fn today() -> Self {
        DatePartition::from(Utc::now())
    }

    /// Object key of a dated collection. The month is not zero padded (`month=3`).
    pub fn object_key(&self, prefix: &str) -> String {
        format!("{prefix}-data/{partition}/{prefix}.json", prefix = prefix, partition = self)
    }
}

impl Display for DatePartition {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "year={}/month={}", self.year, self.month)
    }
}

/// Object key of an organization snapshot.
pub fn organisation_key(name: &str) -> String {
    format!("organisation-data/{}.json", name)
}

#[cfg(test)]
mod tests {
    use crate::date_partition::{organisation_key, DatePartition};
    use chrono::{DateTime, Utc};
    use std::str::FromStr;

    #[test]
    fn test_from_date_time() {
        let date_time = DateTime::<Utc>::from_str("2020-12-01T15:00:00.0+00:00").unwrap();

        assert_eq!(
            DatePartition::from(date_time),
            DatePartition {
                year: 2020,
                month: 12
            }
        );
    }

    #[test]
    fn test_object_key_month_is_not_padded() {
        let partition = DatePartition {
            year: 2024,
            month: 3,
        };
        assert_eq!(
            partition.object_key("cost"),
            "cost-data/year=2024/month=3/cost.json"
        );
    }

    #[test]
    fn test_organisation_key() {
        assert_eq!(organisation_key("ou-org"), "organisation-data/ou-org.json");
    }
}
