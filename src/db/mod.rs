pub mod achievement_details;
pub mod achievements;
pub mod lecturers;
pub mod permissions;
pub mod reports;
pub mod students;
pub mod users;

#[cfg(test)]
pub(crate) mod fixtures {
    use fake::faker::internet::en::{SafeEmail, Username};
    use fake::Fake;
    use sqlx::PgPool;
    use uuid::Uuid;

    use super::users::{self, NewUser};
    use crate::models::users::User;

    pub async fn user_with_role(pool: &PgPool, role: &str) -> User {
        let role = users::get_role_by_name(pool, role).await.unwrap();
        let suffix = Uuid::new_v4().simple().to_string();
        let username = format!("{}_{}", Username().fake::<String>(), &suffix[..8]);
        let email = format!("{}.{}", &suffix[..8], SafeEmail().fake::<String>());

        users::create_user(
            pool,
            NewUser {
                username: &username,
                email: &email,
                password: "rahasia123",
                full_name: "Test User",
                role_id: role.id,
            },
        )
        .await
        .unwrap()
    }
}
