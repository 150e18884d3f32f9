pub mod breathing;
pub mod companion;
pub mod coping;
pub mod health;
pub mod moods;
pub mod session;
pub mod settings;
pub mod ws;
