use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::test::TestRequest;
use actix_web::{web, App, Error};
use secrecy::Secret;
use uuid::Uuid;

use student_achievements::core::config::{JwtAuthConfig, UploadConfig};
use student_achievements::core::jwt_auth::{generate_jwt_token, JwtClaims};
use student_achievements::core::policy::Role;
use student_achievements::routes::achievement_routes;
use student_achievements::testing::TestStores;

pub const BOUNDARY: &str = "----achievement-upload-boundary";

pub struct TestApp {
    pub stores: TestStores,
    pub jwt: JwtAuthConfig,
    pub uploads: UploadConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let directory =
            std::env::temp_dir().join(format!("achievement-uploads-{}", Uuid::new_v4()));
        TestApp {
            stores: TestStores::new(),
            jwt: JwtAuthConfig {
                secret: Secret::new("integration-test-secret".to_string()),
                token_expiration_time: 60,
                refresh_token_expiration_time: 120,
            },
            uploads: UploadConfig {
                directory: directory.to_string_lossy().into_owned(),
                public_base_url: "http://localhost/".to_string(),
                max_file_size: 1024 * 1024,
            },
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        App::new()
            .configure(achievement_routes)
            .app_data(web::Data::new(self.stores.lifecycle()))
            .app_data(web::Data::new(self.stores.reports()))
            .app_data(web::Data::new(self.jwt.clone()))
            .app_data(web::Data::new(self.uploads.clone()))
    }

    pub fn token(&self, user_id: Uuid, role: Role) -> String {
        let claims = JwtClaims::access(&self.jwt, user_id, "tester", role, vec![]);
        generate_jwt_token(&self.jwt, &claims).unwrap()
    }

    /// Registers a student profile for a fresh user and returns their token.
    pub fn student_token(&self) -> String {
        let user_id = Uuid::new_v4();
        self.stores.add_student(user_id);
        self.token(user_id, Role::Student)
    }

    pub fn get(&self, uri: &str, token: &str) -> TestRequest {
        authorized(TestRequest::get().uri(uri), token)
    }

    pub fn post(&self, uri: &str, token: &str) -> TestRequest {
        authorized(TestRequest::post().uri(uri), token)
    }

    pub fn put(&self, uri: &str, token: &str) -> TestRequest {
        authorized(TestRequest::put().uri(uri), token)
    }

    pub fn patch(&self, uri: &str, token: &str) -> TestRequest {
        authorized(TestRequest::patch().uri(uri), token)
    }

    pub fn delete(&self, uri: &str, token: &str) -> TestRequest {
        authorized(TestRequest::delete().uri(uri), token)
    }
}

fn authorized(request: TestRequest, token: &str) -> TestRequest {
    request.insert_header(("Authorization", format!("Bearer {}", token)))
}
