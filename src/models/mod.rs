pub mod achievements;
pub mod lecturers;
pub mod permissions;
pub mod reports;
pub mod students;
pub mod uploads;
pub mod users;
