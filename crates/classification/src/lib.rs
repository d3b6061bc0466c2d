pub mod spam;
pub mod tags;
pub mod tier;

pub use spam::{evaluate_spam, SpamOutcome, SpamSignals};
pub use tags::{Tag, TagSet, UnknownTag};
pub use tier::{classify_tier, Tier};
