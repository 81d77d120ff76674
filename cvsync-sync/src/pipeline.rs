//! Shared sync cycle entrypoint used by the CLI and the daemon.

use std::fmt;
use std::str::FromStr;

use cvsync_core::SyncSettings;

use crate::department::{reconcile_departments, DepartmentReport};
use crate::employee::{reconcile_employees, EmployeeReport};
use crate::error::SyncError;
use crate::service::{SourceDirectory, TargetDirectory};

/// Which entity types a cycle reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncScope {
    /// Departments, then employees.
    #[default]
    All,
    Departments,
    Employees,
}

impl SyncScope {
    pub fn includes_departments(self) -> bool {
        matches!(self, SyncScope::All | SyncScope::Departments)
    }

    pub fn includes_employees(self) -> bool {
        matches!(self, SyncScope::All | SyncScope::Employees)
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncScope::All => write!(f, "all"),
            SyncScope::Departments => write!(f, "departments"),
            SyncScope::Employees => write!(f, "employees"),
        }
    }
}

impl FromStr for SyncScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(SyncScope::All),
            "departments" => Ok(SyncScope::Departments),
            "employees" => Ok(SyncScope::Employees),
            other => Err(format!("unknown sync scope '{other}'")),
        }
    }
}

/// Result of one cycle. `None` means the entity type was out of scope.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub departments: Option<Result<DepartmentReport, SyncError>>,
    pub employees: Option<Result<EmployeeReport, SyncError>>,
}

impl CycleReport {
    /// `true` when every reconciliation that ran finished without failures.
    pub fn is_success(&self) -> bool {
        let departments_ok = match &self.departments {
            None => true,
            Some(Ok(report)) => report.is_success(),
            Some(Err(_)) => false,
        };
        let employees_ok = match &self.employees {
            None => true,
            Some(Ok(report)) => report.is_success(),
            Some(Err(_)) => false,
        };
        departments_ok && employees_ok
    }
}

/// Run one sync cycle for `scope`.
///
/// Departments always go first because persons reference department codes. A
/// failed department reconciliation is logged and employees still run.
pub async fn run(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
    settings: &SyncSettings,
    scope: SyncScope,
    dry_run: bool,
) -> CycleReport {
    let mut report = CycleReport::default();

    if scope.includes_departments() {
        tracing::info!("reconciling departments");
        let result = reconcile_departments(source, target, settings, dry_run).await;
        match &result {
            Ok(r) => tracing::info!(
                created = r.created.len(),
                deleted = r.deleted.len(),
                failed = r.failures.len(),
                "departments reconciled",
            ),
            Err(e) => tracing::error!(error = %e, "department reconciliation aborted"),
        }
        report.departments = Some(result);
    }

    if scope.includes_employees() {
        tracing::info!("reconciling employees");
        let result = reconcile_employees(source, target, settings, dry_run).await;
        match &result {
            Ok(r) => tracing::info!(
                created = r.created,
                updated = r.updated,
                deleted = r.deleted,
                failed = r.failures.len(),
                "employees reconciled",
            ),
            Err(e) => tracing::error!(error = %e, "employee reconciliation aborted"),
        }
        report.employees = Some(result);
    }

    report
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("all", SyncScope::All, true, true)]
    #[case("departments", SyncScope::Departments, true, false)]
    #[case("employees", SyncScope::Employees, false, true)]
    fn scope_parses_and_selects(
        #[case] text: &str,
        #[case] scope: SyncScope,
        #[case] departments: bool,
        #[case] employees: bool,
    ) {
        assert_eq!(text.parse::<SyncScope>(), Ok(scope));
        assert_eq!(scope.to_string(), text);
        assert_eq!(scope.includes_departments(), departments);
        assert_eq!(scope.includes_employees(), employees);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!("persons".parse::<SyncScope>().is_err());
    }

    #[test]
    fn empty_report_is_success() {
        assert!(CycleReport::default().is_success());
    }

    #[test]
    fn report_with_failed_reconciliation_is_not_success() {
        let report = CycleReport {
            departments: Some(Ok(DepartmentReport::default())),
            employees: Some(Err(SyncError::Fetch {
                side: crate::Side::Source,
                what: "employees",
                source: "timeout".into(),
            })),
        };
        assert!(!report.is_success());
    }
}
