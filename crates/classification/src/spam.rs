use chrono::Duration;

use crate::tags::Tag;

/// Prior reports from the same reporter that make the candidate high-volume.
pub const REPORTER_VOLUME_LIMIT: i64 = 5;
/// Distinct establishments (candidate's own included) that make the reporter
/// multi-establishment.
pub const REPORTER_BREADTH_LIMIT: i64 = 10;
/// Prior reports against the same establishment that make it an existing case.
pub const ESTABLISHMENT_VOLUME_LIMIT: i64 = 9;

/// Score ceiling when any rule fires.
pub const SHARED_SCORE_CAP: i32 = 50;
/// Score ceiling when both reporter rules fire together.
pub const COMBINED_SCORE_CAP: i32 = 25;

pub fn reporter_volume_window() -> Duration {
    Duration::hours(24)
}

pub fn reporter_breadth_window() -> Duration {
    Duration::days(7)
}

pub fn establishment_volume_window() -> Duration {
    Duration::days(7)
}

/// Time-windowed aggregates for one candidate report, computed against
/// committed rows with every window ending at the candidate's creation
/// instant. `reporter_reports_24h` and `establishment_reports_7d` exclude the
/// candidate itself; `reporter_establishments_7d` is the distinct-pair count
/// with the candidate's own establishment already folded in, matching the
/// observable behavior of the source rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpamSignals {
    pub reporter_reports_24h: i64,
    pub reporter_establishments_7d: i64,
    pub establishment_reports_7d: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpamOutcome {
    pub tags: Vec<Tag>,
    pub score_cap: Option<i32>,
}

impl SpamOutcome {
    /// Lower `score` to the cap, if any rule demanded one.
    pub fn capped_score(&self, score: i32) -> i32 {
        match self.score_cap {
            Some(cap) => score.min(cap),
            None => score,
        }
    }
}

/// Evaluate the three submission-pattern rules. Annotates only: a candidate
/// is never rejected here, however many rules fire.
pub fn evaluate_spam(signals: &SpamSignals) -> SpamOutcome {
    let mut tags = Vec::new();

    let high_volume = signals.reporter_reports_24h >= REPORTER_VOLUME_LIMIT;
    let multi_establishment = signals.reporter_establishments_7d >= REPORTER_BREADTH_LIMIT;
    let existing_case = signals.establishment_reports_7d >= ESTABLISHMENT_VOLUME_LIMIT;

    if high_volume {
        tags.push(Tag::HighVolumeReporter);
    }
    if multi_establishment {
        tags.push(Tag::MultiEstablishmentReporter);
    }
    if existing_case {
        tags.push(Tag::ExistingCase);
    }

    let score_cap = if high_volume && multi_establishment {
        Some(COMBINED_SCORE_CAP)
    } else if high_volume || multi_establishment || existing_case {
        Some(SHARED_SCORE_CAP)
    } else {
        None
    };

    SpamOutcome { tags, score_cap }
}
