use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files as fs;
use actix_web::http::header;
use actix_web::{dev::Server, web::Data, App, HttpServer};
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::core::config::{JwtAuthConfig, UploadConfig};
use crate::core::AppConfig;
use crate::db::achievement_details::MongoAchievementDetails;
use crate::db::achievements::PgAchievementReferences;
use crate::db::reports::PgStatistics;
use crate::db::students::PgStudentDirectory;
use crate::routes::achievement_routes;
use crate::services::{AchievementLifecycle, ReportAggregator};

pub struct AchievementWebServer {
    port: u16,
    server: Server,
}

impl AchievementWebServer {
    pub async fn build(configuration: AppConfig) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.server.host, configuration.server.port
        );

        let pg_pool = configuration.postgres.pool();
        sqlx::migrate!("./migrations").run(&pg_pool).await?;

        let mongo = configuration.mongo.connect().await?;

        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(
            listener,
            pg_pool,
            mongo,
            configuration.jwt_auth_config,
            configuration.uploads,
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    pg_pool: PgPool,
    mongo: mongodb::Database,
    jwt_auth_config: JwtAuthConfig,
    uploads: UploadConfig,
) -> Result<Server, anyhow::Error> {
    let students = Arc::new(PgStudentDirectory::new(pg_pool.clone()));
    let references = Arc::new(PgAchievementReferences::new(pg_pool.clone()));

    let lifecycle = Data::new(AchievementLifecycle::new(
        Arc::new(MongoAchievementDetails::new(&mongo)),
        references.clone(),
        students.clone(),
    ));
    let reports = Data::new(ReportAggregator::new(
        Arc::new(PgStatistics::new(pg_pool.clone())),
        references,
        students,
    ));
    let upload_directory = uploads.directory.clone();
    let pg_pool = Data::new(pg_pool);
    let jwt_auth_config = Data::new(jwt_auth_config);
    let uploads = Data::new(uploads);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
            ])
            .supports_credentials();
        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(achievement_routes)
            .service(fs::Files::new("/uploads", &upload_directory))
            .app_data(pg_pool.clone())
            .app_data(lifecycle.clone())
            .app_data(reports.clone())
            .app_data(jwt_auth_config.clone())
            .app_data(uploads.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
