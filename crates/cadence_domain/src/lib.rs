pub mod clock;
pub mod history;
pub mod occurrence;
pub mod overdue;
pub mod reconcile;
pub mod recurrence;
pub mod scheduler;
pub mod service;
pub mod sorting;
pub mod stores;
pub mod task;

pub use crate::service::{TaskService, TaskServiceBuilder};
