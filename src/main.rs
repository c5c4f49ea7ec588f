use std::fmt::{Debug, Display};

use student_achievements::achievement_web_server::AchievementWebServer;
use student_achievements::core::{get_subscriber, init_subscriber, AppConfig};
use tokio::task::JoinError;

use colored::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let file_appender =
        tracing_appender::rolling::daily("/var/tmp/log/student_achievements", "app");

    let subscriber = get_subscriber("student_achievements".into(), "info".into(), file_appender);
    init_subscriber(subscriber);

    let config = AppConfig::new()?;

    let achievement_web_server = AchievementWebServer::build(config.clone()).await?;

    let server_task = tokio::spawn(achievement_web_server.run_until_stopped());

    println!("{}", "-----------------------------------------".green());
    println!(
        "🚀 Server started on Addr: {}:{}",
        config.server.host, config.server.port
    );
    println!("{}", "-----------------------------------------".green());

    tokio::select! {
        outcome = server_task => report_exit("achievement web server", outcome),
    }
    Ok(())
}

fn report_exit(task_name: &str, outcome: Result<Result<(), impl Debug + Display>, JoinError>) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{} has exited", task_name)
        }
        Ok(Err(e)) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{} failed",
                task_name
            )
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{} task failed to complete",
                task_name
            )
        }
    }
}
