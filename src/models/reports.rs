use serde::Serialize;

use super::achievements::{AchievementReference, AchievementStatus};
use super::students::StudentProfile;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub draft: i64,
    pub submitted: i64,
    pub verified: i64,
    pub rejected: i64,
}

impl StatusBreakdown {
    pub fn record(&mut self, status: AchievementStatus, count: i64) {
        match status {
            AchievementStatus::Draft => self.draft += count,
            AchievementStatus::Submitted => self.submitted += count,
            AchievementStatus::Verified => self.verified += count,
            AchievementStatus::Rejected => self.rejected += count,
        }
    }

    /// Buckets raw stored literals case-insensitively; unknown literals are skipped.
    pub fn from_counts<'a>(rows: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let mut breakdown = StatusBreakdown::default();
        for (literal, count) in rows {
            match literal.parse::<AchievementStatus>() {
                Ok(status) => breakdown.record(status, count),
                Err(e) => tracing::warn!("skipping achievement count: {}", e),
            }
        }
        breakdown
    }

    pub fn tally<'a>(references: impl IntoIterator<Item = &'a AchievementReference>) -> Self {
        let mut breakdown = StatusBreakdown::default();
        for reference in references {
            breakdown.record(reference.status, 1);
        }
        breakdown
    }

    pub fn total(&self) -> i64 {
        self.draft + self.submitted + self.verified + self.rejected
    }
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub total_students: i64,
    pub total_lecturers: i64,
    pub total_achievements: i64,
    pub achievement_stats: StatusBreakdown,
}

#[derive(Debug, Serialize)]
pub struct StudentReport {
    pub student: StudentProfile,
    pub total_achievements: i64,
    pub achievement_stats: StatusBreakdown,
    pub achievements: Vec<AchievementReference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_literals_are_bucketed_case_insensitively() {
        let breakdown = StatusBreakdown::from_counts([
            ("draft", 2),
            ("Draft", 1),
            ("SUBMITTED", 4),
            ("verified", 3),
            ("rejected", 1),
            ("archived", 9),
        ]);

        assert_eq!(
            breakdown,
            StatusBreakdown {
                draft: 3,
                submitted: 4,
                verified: 3,
                rejected: 1,
            }
        );
        assert_eq!(breakdown.total(), 11);
    }
}
