//! Per-run import outcome reporting

use serde::Serialize;

/// Why an individual record was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MalformedIdentifier,
    IncompleteRecord,
    TargetNotFound,
    InvalidGeometry,
    InvalidScore,
    InvalidSide,
    DuplicateSide,
}

/// One refused record, identified by its raw wire id.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub id: String,
    pub reason: RejectReason,
    pub detail: String,
}

/// The outcome of one import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub rejections: Vec<Rejection>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.rejections.is_empty()
    }

    pub fn total_processed(&self) -> usize {
        self.created + self.updated + self.rejections.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} rejected",
            self.created,
            self.updated,
            self.rejections.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_serialize_snake_case() {
        let json = serde_json::to_string(&RejectReason::DuplicateSide).unwrap();
        assert_eq!(json, r#""duplicate_side""#);
    }

    #[test]
    fn summary_counts() {
        let report = ImportReport {
            created: 3,
            updated: 1,
            rejections: vec![Rejection {
                id: "x".to_string(),
                reason: RejectReason::IncompleteRecord,
                detail: "no title".to_string(),
            }],
        };
        assert!(!report.is_success());
        assert_eq!(report.total_processed(), 5);
        assert_eq!(report.summary(), "3 created, 1 updated, 1 rejected");
    }
}
