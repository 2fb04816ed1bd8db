mod activity;
mod bonus;
mod certificate;
mod ids;
mod profile;
mod progress;
mod step;

pub use ids::{ActivityId, ParseIdError, StepId};

pub use activity::{ActivityKind, ActivityRecord};
pub use bonus::{BonusTier, GOLD_THRESHOLD_SECS, SILVER_THRESHOLD_SECS, TimeBonus};
pub use certificate::{
    BackgroundStyle, CertificateRegistry, CertificateRequest, CertificateTier, Palette,
    RegistryEntry, Rgb,
};
pub use profile::{ProfileError, RatingError, SatisfactionRating, StudentProfile, Theme};
pub use progress::{FinalResults, ProgressSnapshot};
pub use step::{StepPhase, StepState};
