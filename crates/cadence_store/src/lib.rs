pub mod history;
pub mod one_offs;
pub mod paths;
pub mod recurring;
pub mod templates;

mod db;

pub use crate::history::HistoryDb;
pub use crate::one_offs::OneOffDb;
pub use crate::paths::DataPaths;
pub use crate::recurring::RecurringDb;
pub use crate::templates::TemplateFile;
