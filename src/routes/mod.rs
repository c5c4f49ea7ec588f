use actix_web::web::{scope, JsonConfig, PathConfig, QueryConfig, ServiceConfig};
use actix_web::Scope;

use crate::core::AppError;
use achievements::{
    create_achievement, delete_achievement, get_achievement, list_achievements,
    list_my_achievements, submit_achievement, update_achievement, upload_attachment,
    verify_achievement,
};
use lecturers::{create_lecturer, list_advisees, list_lecturers};
use permissions::{
    assign_permission, create_permission, get_role_permissions, list_permissions, list_roles,
};
use reports::{get_statistics, get_student_report};
use students::{create_student, current_student, get_student, list_students, set_advisor};
use users::{
    deactivate_user, get_profile, list_users, login, refresh_token, register, update_user,
    update_user_role,
};

mod achievements;
mod health_check;
mod lecturers;
mod permissions;
mod reports;
mod students;
mod users;

use crate::routes::health_check::*;

fn util_routes() -> Scope {
    scope("").service(health_check)
}

fn auth_routes() -> Scope {
    scope("auth")
        .service(register)
        .service(login)
        .service(refresh_token)
        .service(get_profile)
}

fn users_routes() -> Scope {
    scope("users")
        .service(list_users)
        .service(update_user_role)
        .service(update_user)
        .service(deactivate_user)
}

fn roles_routes() -> Scope {
    scope("roles")
        .service(list_roles)
        .service(get_role_permissions)
}

fn permissions_routes() -> Scope {
    scope("permissions")
        .service(assign_permission)
        .service(create_permission)
        .service(list_permissions)
}

fn students_routes() -> Scope {
    scope("students")
        .service(create_student)
        .service(current_student)
        .service(list_students)
        .service(get_student)
        .service(set_advisor)
}

fn lecturers_routes() -> Scope {
    scope("lecturers")
        .service(create_lecturer)
        .service(list_lecturers)
        .service(list_advisees)
}

fn achievements_routes() -> Scope {
    // `/achiev` must be matched before `/{id}`.
    scope("achievements")
        .service(create_achievement)
        .service(list_achievements)
        .service(list_my_achievements)
        .service(get_achievement)
        .service(update_achievement)
        .service(delete_achievement)
        .service(submit_achievement)
        .service(verify_achievement)
        .service(upload_attachment)
}

fn reports_routes() -> Scope {
    scope("reports")
        .service(get_statistics)
        .service(get_student_report)
}

/// Malformed bodies, paths and queries answer with the usual 400 envelope.
fn extractor_configs(conf: &mut ServiceConfig) {
    conf.app_data(JsonConfig::default().error_handler(|err, _req| {
        AppError::validation_error(format!("Invalid request body: {}", err)).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, _req| {
        AppError::validation_error(format!("Invalid path parameter: {}", err)).into()
    }))
    .app_data(QueryConfig::default().error_handler(|err, _req| {
        AppError::validation_error(format!("Invalid query parameter: {}", err)).into()
    }));
}

pub fn achievement_routes(conf: &mut ServiceConfig) {
    extractor_configs(conf);
    conf.service(
        scope("api/v1")
            .service(auth_routes())
            .service(users_routes())
            .service(roles_routes())
            .service(permissions_routes())
            .service(students_routes())
            .service(lecturers_routes())
            .service(achievements_routes())
            .service(reports_routes())
            .service(util_routes()),
    );
}
