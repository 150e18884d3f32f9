pub mod clock;
pub mod session;
pub mod store;
pub mod theme;
pub mod trend;
