use actix_web::{get, web, HttpResponse};

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::policy::Capability;
use crate::core::utils::parse_uuid;
use crate::core::{AppError, AppSuccessResponse};
use crate::services::ReportAggregator;

#[tracing::instrument(name = "Achievement Statistics", skip(reports, auth))]
#[get("/statistics")]
pub async fn get_statistics(
    reports: web::Data<ReportAggregator>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewReports)?;

    let statistics = reports.statistics().await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        statistics,
        "Statistics retrieved successfully",
    )))
}

#[tracing::instrument(name = "Student Achievement Report", skip(reports, auth))]
#[get("/student/{id}")]
pub async fn get_student_report(
    reports: web::Data<ReportAggregator>,
    auth: JwtMiddleware,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewReports)?;
    let student_id = parse_uuid(&id, "student id")?;

    let report = reports.student_report(student_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        report,
        "Student report retrieved successfully",
    )))
}
