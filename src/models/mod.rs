//! Data models

pub mod apparatus;
pub mod attendance;
pub mod book;
pub mod dashboard;
pub mod loan;
pub mod student;

// Re-export commonly used types
pub use apparatus::Apparatus;
pub use attendance::{AttendanceLog, ScanAction};
pub use book::Book;
pub use loan::{LoanRecord, LoanStatus};
pub use student::{Student, StudentShort};
