/// Project rollups from their tasks
pub mod aggregate;
/// Source-to-task allocations and capacity checks
pub mod allocation;
/// Kiyosaki, Buffett, Ramsey and family canvas indicators
pub mod analysis;
/// Dashboard KPIs and source totals
pub mod kpi;
/// Monthly series and gauges
pub mod monthly;
/// Typed access to the parameter table
pub mod parameters;
/// Date windows and filter selections
pub mod period;
/// Project lifecycle
pub mod project;
/// Text rendering of the dashboard
pub mod report;
/// JSON snapshot import and export
pub mod snapshot;
/// Funding source lifecycle
pub mod source;
/// Task lifecycle
pub mod task;
/// Household members
pub mod user;
