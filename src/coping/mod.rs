pub mod affirmations;
pub mod breathing;
pub mod scheduler;
