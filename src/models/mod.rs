pub mod mood;
pub mod settings;
pub mod theme;
