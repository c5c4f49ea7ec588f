mod achievements;
mod helpers;
mod reports;
