pub mod announcements;
pub mod classes;
pub mod core;
pub mod reports;
pub mod schedule;
pub mod settings;
pub mod students;
pub mod teachers;
