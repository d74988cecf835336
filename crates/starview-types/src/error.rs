#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid badge slug {slug:?}: {reason}")]
    InvalidSlug { slug: String, reason: &'static str },
    #[error("tier {tier} outside {min}..={max}")]
    TierOutOfRange { tier: u8, min: u8, max: u8 },
}
