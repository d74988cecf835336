use starview_types::{BadgeCategory, BadgeDefinition, BadgeSlug, CriteriaType};

use BadgeCategory::*;
use CriteriaType::*;

fn badge(
    slug: &'static str,
    name: &str,
    description: &str,
    category: BadgeCategory,
    criteria_type: CriteriaType,
    criteria_value: u64,
    tier: u8,
) -> BadgeDefinition {
    BadgeDefinition {
        slug: BadgeSlug::from_static(slug),
        name: name.to_string(),
        description: description.to_string(),
        category,
        criteria_type,
        criteria_value,
        criteria_secondary: None,
        tier,
        revocable: true,
    }
}

/// The production badge set, installed on a fresh database.
pub fn default_catalog() -> Vec<BadgeDefinition> {
    vec![
        badge("first-light", "First Light", "Visit your first location", Exploration, LocationVisits, 1, 1),
        badge("explorer", "Explorer", "Visit 5 locations", Exploration, LocationVisits, 5, 2),
        badge("pathfinder", "Pathfinder", "Visit 10 locations", Exploration, LocationVisits, 10, 3),
        badge("sky-seeker", "Sky Seeker", "Visit 25 locations", Exploration, LocationVisits, 25, 4),
        badge("stargazer", "Stargazer", "Visit 50 locations", Exploration, LocationVisits, 50, 5),
        badge("scout", "Scout", "Add your first location", Contribution, LocationsAdded, 1, 1),
        badge("discoverer", "Discoverer", "Add 5 locations", Contribution, LocationsAdded, 5, 2),
        badge("trailblazer", "Trailblazer", "Add 10 locations", Contribution, LocationsAdded, 10, 3),
        badge("cartographer", "Cartographer", "Add 25 locations", Contribution, LocationsAdded, 25, 4),
        badge("quality-contributor", "Quality Contributor", "3 of your locations rated 4+ stars", Quality, WellRatedLocations, 3, 1),
        badge("trusted-source", "Trusted Source", "5 of your locations rated 4+ stars", Quality, WellRatedLocations, 5, 2),
        badge("elite-curator", "Elite Curator", "10 of your locations rated 4+ stars", Quality, WellRatedLocations, 10, 3),
        badge("reviewer", "Reviewer", "Write 5 reviews", Review, ReviewsWritten, 5, 1),
        badge("helpful-voice", "Helpful Voice", "Receive 10 upvotes", Review, UpvotesReceived, 10, 2),
        badge("expert-reviewer", "Expert Reviewer", "25 reviews with 75%+ helpful votes", Review, HelpfulRatio, 25, 3)
            .with_secondary(75),
        badge("trusted-critic", "Trusted Critic", "50 reviews with 80%+ helpful votes", Review, HelpfulRatio, 50, 4)
            .with_secondary(80),
        badge("review-master", "Review Master", "100 reviews with 85%+ helpful votes", Review, HelpfulRatio, 100, 5)
            .with_secondary(85),
        badge("connector", "Connector", "Gain 10 followers", Community, FollowerCount, 10, 1),
        badge("popular", "Popular", "Gain 50 followers", Community, FollowerCount, 50, 2),
        badge("influencer", "Influencer", "Gain 100 followers", Community, FollowerCount, 100, 3),
        badge("conversationalist", "Conversationalist", "Comment on 10 reviews by others", Community, CommentsWritten, 10, 2),
        badge("photographer", "Photographer", "Upload 25 photos", Special, PhotosUploaded, 25, 1),
        badge("stellar-profile", "Stellar Profile", "Complete every profile field", Special, ProfileCompleteness, 100, 1),
        badge("pioneer", "Pioneer", "One of the first 100 stargazers", Tenure, TenureRank, 100, 1)
            .non_revocable(),
    ]
}
