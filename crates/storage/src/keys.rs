use std::fmt;

/// Keys of the persisted progress store. The string forms are stable; other
/// pages of the same course read them too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    StudentData,
    UnlockedStep,
    PlayerScore,
    ResearchNotes,
    Theme,
    /// Unix milliseconds.
    CourseStartTime,
    CompletionTimeSeconds,
    SatisfactionRating,
    TimeBonus,
    CertificateRegistry,
}

impl StoreKey {
    pub const ALL: [StoreKey; 10] = [
        StoreKey::StudentData,
        StoreKey::UnlockedStep,
        StoreKey::PlayerScore,
        StoreKey::ResearchNotes,
        StoreKey::Theme,
        StoreKey::CourseStartTime,
        StoreKey::CompletionTimeSeconds,
        StoreKey::SatisfactionRating,
        StoreKey::TimeBonus,
        StoreKey::CertificateRegistry,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::StudentData => "studentData",
            StoreKey::UnlockedStep => "unlockedStep",
            StoreKey::PlayerScore => "playerScore",
            StoreKey::ResearchNotes => "pythonResearchNotes",
            StoreKey::Theme => "theme",
            StoreKey::CourseStartTime => "courseStartTime",
            StoreKey::CompletionTimeSeconds => "completionTimeSeconds",
            StoreKey::SatisfactionRating => "satisfactionRating",
            StoreKey::TimeBonus => "timeBonus",
            StoreKey::CertificateRegistry => "certificateRegistry",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
