pub mod app;
pub mod event;
pub mod leaderboard;
pub mod level;
pub mod scene;
pub mod session;
