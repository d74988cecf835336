//! The `(fact, outcome) -> evaluations` binding table.
//!
//! Every relationship between an activity fact and the badge groups it can
//! move lives in [`plan_for`]. The table is exhaustive over [`FactType`], so a
//! new fact kind does not compile until it is bound here.

use serde::Serialize;
use starview_types::{
    ActivityEvent, BadgeCategory, CriteriaType, FactOutcome, FactType, UserId,
};

use crate::sweep::SweepMode;

use BadgeCategory as Cat;
use CriteriaType as Crit;
use SweepMode::{Award, Full, Revoke};

/// Whose aggregate a binding evaluates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Target {
    /// The user who performed the action.
    Actor,
    /// The owner of the related entity (location author, review author,
    /// followed user).
    RelatedOwner,
}

impl Target {
    pub fn resolve(&self, event: &ActivityEvent) -> Option<UserId> {
        match self {
            Self::Actor => Some(event.user),
            Self::RelatedOwner => event.related_owner,
        }
    }
}

/// One evaluator invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub target: Target,
    pub category: BadgeCategory,
    pub criteria: CriteriaType,
    pub mode: SweepMode,
}

const fn bind(target: Target, category: Cat, criteria: Crit, mode: SweepMode) -> Binding {
    Binding {
        target,
        category,
        criteria,
        mode,
    }
}

/// Everything the engine does in response to one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TriggerPlan {
    pub bindings: &'static [Binding],
    /// Record a visit for `(actor, related location)` if none exists, then
    /// handle it as a visit event of its own.
    pub implicit_visit: bool,
    /// Run the visit burst check after evaluation.
    pub anomaly_check: bool,
}

const NONE: &[Binding] = &[];

const VISIT_CREATED: &[Binding] = &[bind(Target::Actor, Cat::Exploration, Crit::LocationVisits, Award)];
const VISIT_REMOVED: &[Binding] = &[bind(Target::Actor, Cat::Exploration, Crit::LocationVisits, Revoke)];

const LOCATION_CREATED: &[Binding] = &[bind(Target::Actor, Cat::Contribution, Crit::LocationsAdded, Award)];
const LOCATION_REMOVED: &[Binding] = &[
    bind(Target::Actor, Cat::Contribution, Crit::LocationsAdded, Revoke),
    bind(Target::Actor, Cat::Quality, Crit::WellRatedLocations, Revoke),
];

// A new rating can lift or sink a location's average, so quality is swept both ways.
const REVIEW_CREATED: &[Binding] = &[
    bind(Target::Actor, Cat::Review, Crit::ReviewsWritten, Award),
    bind(Target::Actor, Cat::Review, Crit::HelpfulRatio, Award),
    bind(Target::RelatedOwner, Cat::Quality, Crit::WellRatedLocations, Full),
];
// Deleting a review also deletes the votes on it.
const REVIEW_REMOVED: &[Binding] = &[
    bind(Target::Actor, Cat::Review, Crit::ReviewsWritten, Revoke),
    bind(Target::Actor, Cat::Review, Crit::UpvotesReceived, Revoke),
    bind(Target::Actor, Cat::Review, Crit::HelpfulRatio, Full),
    bind(Target::RelatedOwner, Cat::Quality, Crit::WellRatedLocations, Full),
];

const VOTE_ANY: &[Binding] = &[
    bind(Target::RelatedOwner, Cat::Review, Crit::UpvotesReceived, Full),
    bind(Target::RelatedOwner, Cat::Review, Crit::HelpfulRatio, Full),
];

const FOLLOW_CREATED: &[Binding] = &[bind(Target::RelatedOwner, Cat::Community, Crit::FollowerCount, Award)];
const FOLLOW_REMOVED: &[Binding] = &[bind(Target::RelatedOwner, Cat::Community, Crit::FollowerCount, Revoke)];

const COMMENT_CREATED: &[Binding] = &[bind(Target::Actor, Cat::Community, Crit::CommentsWritten, Award)];
const COMMENT_REMOVED: &[Binding] = &[bind(Target::Actor, Cat::Community, Crit::CommentsWritten, Revoke)];

const PHOTO_CREATED: &[Binding] = &[bind(Target::Actor, Cat::Special, Crit::PhotosUploaded, Award)];
const PHOTO_REMOVED: &[Binding] = &[bind(Target::Actor, Cat::Special, Crit::PhotosUploaded, Revoke)];

const PROFILE_ANY: &[Binding] = &[bind(Target::Actor, Cat::Special, Crit::ProfileCompleteness, Full)];

const REGISTRATION_CREATED: &[Binding] = &[bind(Target::Actor, Cat::Tenure, Crit::TenureRank, Award)];

const fn plan(bindings: &'static [Binding]) -> TriggerPlan {
    TriggerPlan {
        bindings,
        implicit_visit: false,
        anomaly_check: false,
    }
}

/// Look up the trigger plan for a fact/outcome pair.
///
/// Pairs with no meaning (a "changed" visit, a removed registration) map to
/// an empty plan.
pub fn plan_for(fact: FactType, outcome: FactOutcome) -> TriggerPlan {
    use FactOutcome::{Changed, Created, Removed};

    match fact {
        FactType::Visit => match outcome {
            Created => TriggerPlan {
                anomaly_check: true,
                ..plan(VISIT_CREATED)
            },
            Removed => plan(VISIT_REMOVED),
            Changed => plan(NONE),
        },
        FactType::LocationAuthored => match outcome {
            Created => plan(LOCATION_CREATED),
            Removed => plan(LOCATION_REMOVED),
            Changed => plan(NONE),
        },
        FactType::Review => match outcome {
            Created => TriggerPlan {
                implicit_visit: true,
                ..plan(REVIEW_CREATED)
            },
            // An edited rating moves the location average only.
            Changed => plan(&REVIEW_CREATED[2..]),
            Removed => plan(REVIEW_REMOVED),
        },
        FactType::Vote => plan(VOTE_ANY),
        FactType::Follow => match outcome {
            Created => plan(FOLLOW_CREATED),
            Removed => plan(FOLLOW_REMOVED),
            Changed => plan(NONE),
        },
        FactType::Comment => match outcome {
            Created => plan(COMMENT_CREATED),
            Removed => plan(COMMENT_REMOVED),
            Changed => plan(NONE),
        },
        FactType::Photo => match outcome {
            Created => plan(PHOTO_CREATED),
            Removed => plan(PHOTO_REMOVED),
            Changed => plan(NONE),
        },
        FactType::Profile => plan(PROFILE_ANY),
        FactType::Registration => match outcome {
            Created => plan(REGISTRATION_CREATED),
            Changed | Removed => plan(NONE),
        },
    }
}

/// The full table, one row per `(fact, outcome)` pair, for audit and docs.
pub fn binding_table() -> Vec<(FactType, FactOutcome, TriggerPlan)> {
    FactType::ALL
        .into_iter()
        .flat_map(|fact| {
            FactOutcome::ALL
                .into_iter()
                .map(move |outcome| (fact, outcome, plan_for(fact, outcome)))
        })
        .collect()
}
