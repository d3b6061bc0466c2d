use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification evidence attached to a report. The vocabulary is closed:
/// stored tags round-trip through `as_str`/`FromStr`, and the tier reduction
/// matches exhaustively on polarity. `ReporterUnderReview`,
/// `PostClearanceComplaint`, `CredibleReporter` and `ConsistentWithHistory`
/// are representable but not yet emitted by any rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "High-Volume Reporter")]
    HighVolumeReporter,
    #[serde(rename = "Multi-Establishment Reporter")]
    MultiEstablishmentReporter,
    #[serde(rename = "Existing Case")]
    ExistingCase,
    #[serde(rename = "Failed Location Verification")]
    FailedLocationVerification,
    #[serde(rename = "Reporter Under Review")]
    ReporterUnderReview,
    #[serde(rename = "Post-Clearance Complaint")]
    PostClearanceComplaint,
    #[serde(rename = "Location Verified")]
    LocationVerified,
    #[serde(rename = "Credible Reporter")]
    CredibleReporter,
    #[serde(rename = "Consistent With History")]
    ConsistentWithHistory,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::HighVolumeReporter => "High-Volume Reporter",
            Tag::MultiEstablishmentReporter => "Multi-Establishment Reporter",
            Tag::ExistingCase => "Existing Case",
            Tag::FailedLocationVerification => "Failed Location Verification",
            Tag::ReporterUnderReview => "Reporter Under Review",
            Tag::PostClearanceComplaint => "Post-Clearance Complaint",
            Tag::LocationVerified => "Location Verified",
            Tag::CredibleReporter => "Credible Reporter",
            Tag::ConsistentWithHistory => "Consistent With History",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Tag::HighVolumeReporter
                | Tag::MultiEstablishmentReporter
                | Tag::ExistingCase
                | Tag::FailedLocationVerification
                | Tag::ReporterUnderReview
                | Tag::PostClearanceComplaint
        )
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            Tag::LocationVerified | Tag::CredibleReporter | Tag::ConsistentWithHistory
        )
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown tag: {0}")]
pub struct UnknownTag(pub String);

impl FromStr for Tag {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "High-Volume Reporter" => Ok(Tag::HighVolumeReporter),
            "Multi-Establishment Reporter" => Ok(Tag::MultiEstablishmentReporter),
            "Existing Case" => Ok(Tag::ExistingCase),
            "Failed Location Verification" => Ok(Tag::FailedLocationVerification),
            "Reporter Under Review" => Ok(Tag::ReporterUnderReview),
            "Post-Clearance Complaint" => Ok(Tag::PostClearanceComplaint),
            "Location Verified" => Ok(Tag::LocationVerified),
            "Credible Reporter" => Ok(Tag::CredibleReporter),
            "Consistent With History" => Ok(Tag::ConsistentWithHistory),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

/// Tag set with insertion idempotence. Iteration order is the enum
/// declaration order, so persisted `Vec<String>` forms are canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag; adding a present tag is a no-op. Tags are never removed.
    pub fn insert(&mut self, tag: Tag) -> bool {
        self.0.insert(tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains(&tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.iter().copied()
    }

    pub fn has_negative(&self) -> bool {
        self.iter().any(|tag| tag.is_negative())
    }

    pub fn positive_count(&self) -> usize {
        self.iter().filter(|tag| tag.is_positive()).count()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|tag| tag.as_str().to_string()).collect()
    }

    pub fn parse_strings<S: AsRef<str>>(values: &[S]) -> Result<Self, UnknownTag> {
        values
            .iter()
            .map(|value| value.as_ref().parse())
            .collect()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
