//! # cvsync-sync
//!
//! Reconciliation engine that makes CVSecurity mirror MetaContrata.
//!
//! Call [`reconcile_departments`] and [`reconcile_employees`] directly, or
//! [`pipeline::run`] to do both in the required order. The two remote systems
//! are reached only through [`SourceDirectory`] and [`TargetDirectory`].

pub mod batch;
pub mod department;
pub mod diff;
pub mod employee;
pub mod error;
pub mod pipeline;
pub mod service;

pub use batch::{run_in_batches, BatchFailure, BatchOutcome};
pub use department::{
    department_name, plan_departments, reconcile_departments, DepartmentPlan, DepartmentReport,
};
pub use diff::{diff_keys, index_by, KeyDiff};
pub use employee::{
    build_new_person, plan_employees, plan_update, reconcile_employees, EmployeePlan,
    EmployeeReport,
};
pub use error::{Phase, Side, SyncError};
pub use pipeline::{CycleReport, SyncScope};
pub use service::{ServiceError, ServiceResult, SourceDirectory, TargetDirectory};
