pub mod auth;
pub mod client;
pub mod info;
pub mod models;
pub mod tasks;

pub use auth::DOWNLOAD_STATION_SESSION;
pub use client::ApplianceClient;
pub use models::{
    CODE_SESSION_INVALID, InfoReply, Task, TaskActionResult, TaskAdditional, TaskDetail, TaskList,
    TaskTransfer,
};
