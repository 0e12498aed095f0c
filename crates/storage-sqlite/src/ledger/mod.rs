//! SQLite storage for vendors, categories, expense reports and expenses.

mod model;
mod repository;

pub use model::{AttachmentDB, CategoryDB, ExpenseDB, ExpenseReportDB, VendorDB};
pub use repository::LedgerRepository;
