//! Entity module - the records the ledger owns.
//! Projects and tasks form the budget hierarchy, sources hold funds and
//! allocations move funds from a source to a task.

pub mod allocation;
pub mod audit;
pub mod date;
pub mod ids;
pub mod lenient;
pub mod monthly;
pub mod parameter;
pub mod project;
pub mod source;
pub mod user;

pub use allocation::{Allocation, AllocationStatus};
pub use audit::{AuditAction, AuditEvent};
pub use date::LooseDate;
pub use ids::{AllocationId, ProjectId, SourceId, TaskId};
pub use monthly::MonthlyData;
pub use parameter::{ParamValue, Parameter};
pub use project::{Project, Status, Task};
pub use source::Source;
pub use user::User;
