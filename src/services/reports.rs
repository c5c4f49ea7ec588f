use std::sync::Arc;

use uuid::Uuid;

use super::stores::{AchievementReferenceStore, StatisticsSource, StudentDirectory};
use crate::core::AppError;
use crate::models::reports::{StatisticsResponse, StatusBreakdown, StudentReport};

pub struct ReportAggregator {
    statistics: Arc<dyn StatisticsSource>,
    references: Arc<dyn AchievementReferenceStore>,
    students: Arc<dyn StudentDirectory>,
}

impl ReportAggregator {
    pub fn new(
        statistics: Arc<dyn StatisticsSource>,
        references: Arc<dyn AchievementReferenceStore>,
        students: Arc<dyn StudentDirectory>,
    ) -> Self {
        ReportAggregator {
            statistics,
            references,
            students,
        }
    }

    /// Any failing count fails the whole report.
    pub async fn statistics(&self) -> Result<StatisticsResponse, AppError> {
        let total_students = self.statistics.count_students().await?;
        let total_lecturers = self.statistics.count_lecturers().await?;
        let rows = self.statistics.count_achievements_by_status().await?;

        let achievement_stats = StatusBreakdown::from_counts(
            rows.iter().map(|(status, count)| (status.as_str(), *count)),
        );

        Ok(StatisticsResponse {
            total_students,
            total_lecturers,
            total_achievements: achievement_stats.total(),
            achievement_stats,
        })
    }

    pub async fn student_report(&self, student_id: Uuid) -> Result<StudentReport, AppError> {
        let student = self
            .students
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::not_found("Student not found"))?;

        let achievements = self.references.list_by_student(student.id).await?;
        let achievement_stats = StatusBreakdown::tally(&achievements);

        Ok(StudentReport {
            student,
            total_achievements: achievements.len() as i64,
            achievement_stats,
            achievements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AppErrorType;
    use crate::models::achievements::{AchievementRequest, VerifyAchievementRequest};
    use crate::testing::TestStores;
    use std::collections::BTreeMap;

    fn request(title: &str) -> AchievementRequest {
        AchievementRequest {
            achievement_type: "organization".to_string(),
            title: title.to_string(),
            description: String::new(),
            attributes: BTreeMap::new(),
            tags: vec![],
            attachments: vec![],
            points: None,
        }
    }

    #[tokio::test]
    async fn statistics_count_live_achievements_per_status() {
        let stores = TestStores::new();
        let lifecycle = stores.lifecycle();
        let user = Uuid::new_v4();
        stores.add_student(user);
        stores.add_student(Uuid::new_v4());
        stores.set_lecturer_count(3);

        let first = lifecycle.create(user, request("One")).await.unwrap().reference.id;
        let second = lifecycle.create(user, request("Two")).await.unwrap().reference.id;
        let third = lifecycle.create(user, request("Three")).await.unwrap().reference.id;
        lifecycle.submit(first, user).await.unwrap();
        lifecycle
            .verify(
                first,
                Uuid::new_v4(),
                &VerifyAchievementRequest {
                    status: "verified".to_string(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        lifecycle.submit(second, user).await.unwrap();
        lifecycle.soft_delete(third, user).await.unwrap();

        let stats = stores.reports().statistics().await.unwrap();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.total_lecturers, 3);
        assert_eq!(stats.total_achievements, 2);
        assert_eq!(
            stats.achievement_stats,
            StatusBreakdown {
                draft: 0,
                submitted: 1,
                verified: 1,
                rejected: 0,
            }
        );
    }

    #[tokio::test]
    async fn a_failing_count_fails_the_report() {
        let stores = TestStores::new();
        stores.fail_statistics(true);

        let error = stores.reports().statistics().await.unwrap_err();
        assert_eq!(error.error_type, AppErrorType::DbError);
    }

    #[tokio::test]
    async fn student_report_tallies_that_students_achievements() {
        let stores = TestStores::new();
        let lifecycle = stores.lifecycle();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let student = stores.add_student(user);
        stores.add_student(other);

        let first = lifecycle.create(user, request("Mine")).await.unwrap().reference.id;
        lifecycle.create(user, request("Also mine")).await.unwrap();
        lifecycle.create(other, request("Not mine")).await.unwrap();
        lifecycle.submit(first, user).await.unwrap();

        let report = stores.reports().student_report(student.id).await.unwrap();
        assert_eq!(report.student, student);
        assert_eq!(report.total_achievements, 2);
        assert_eq!(report.achievement_stats.draft, 1);
        assert_eq!(report.achievement_stats.submitted, 1);
        assert!(report.achievements.iter().all(|r| r.student_id == student.id));
    }

    #[tokio::test]
    async fn unknown_student_report_is_not_found() {
        let stores = TestStores::new();
        let error = stores
            .reports()
            .student_report(Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(error.error_type, AppErrorType::NotFoundError);
    }
}
