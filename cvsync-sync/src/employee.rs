//! Employee reconciliation.
//!
//! Unlike departments, persons are compared field by field: a person present
//! on both sides is rewritten when its normalized name or access state drifted.
//! All person writes go through [`run_in_batches`]; phases run in the fixed
//! order create, update, delete.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use serde::Serialize;
use tracing::Instrument;

use cvsync_core::{
    normalize_full_name_with, BusinessCode, SourceEmployee, SyncSettings, TargetPerson,
};

use crate::batch::run_in_batches;
use crate::diff::{diff_keys, index_by};
use crate::error::{fetch_err, serialize_errors, Phase, Side, SyncError};
use crate::service::{ServiceResult, SourceDirectory, TargetDirectory};

/// The writes an employee reconciliation would issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployeePlan {
    pub to_create: Vec<TargetPerson>,
    pub to_update: Vec<TargetPerson>,
    pub to_delete: Vec<BusinessCode>,
}

impl EmployeePlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Outcome of [`reconcile_employees`].
///
/// Counts are persons actually written (or, in dry-run mode, planned). A failed
/// batch only counts the batches of its phase applied before it.
#[derive(Debug, Default, Serialize)]
pub struct EmployeeReport {
    pub dry_run: bool,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    #[serde(serialize_with = "serialize_errors")]
    pub failures: Vec<SyncError>,
}

impl EmployeeReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

type SourceIndex = HashMap<BusinessCode, SourceEmployee>;
type TargetIndex = HashMap<BusinessCode, TargetPerson>;

/// A new CVSecurity person for `employee`. `isDisabled` is left unset; access
/// is corrected by the update phase once the person exists.
pub fn build_new_person(employee: &SourceEmployee, max_len: usize) -> TargetPerson {
    let (name, last_name) =
        normalize_full_name_with(&employee.first_name, &employee.last_name(), max_len);
    TargetPerson {
        pin: employee.code.clone(),
        dept_code: employee.department_code.clone(),
        name,
        last_name,
        is_disabled: None,
    }
}

/// The update to send for a person present on both sides, or `None` when the
/// normalized names and the access state already match.
pub fn plan_update(
    employee: &SourceEmployee,
    current: &TargetPerson,
    max_len: usize,
) -> Option<TargetPerson> {
    let (name, last_name) =
        normalize_full_name_with(&employee.first_name, &employee.last_name(), max_len);

    if name == current.name
        && last_name == current.last_name
        && employee.access_allowed == current.access_allowed()
    {
        return None;
    }

    tracing::debug!(
        pin = %employee.code,
        stored_name = %current.name,
        stored_last_name = %current.last_name,
        stored_access = current.access_allowed(),
        access = employee.access_allowed,
        "person drifted from MetaContrata",
    );

    Some(TargetPerson {
        pin: employee.code.clone(),
        dept_code: employee.department_code.clone(),
        name,
        last_name,
        is_disabled: Some(!employee.access_allowed),
    })
}

/// Compute the employee writes from one snapshot of both sides. Pure.
pub fn plan_employees(
    source: Vec<SourceEmployee>,
    target: Vec<TargetPerson>,
    settings: &SyncSettings,
) -> EmployeePlan {
    let source_by_code = index_by(source, |e| e.code.clone());
    let target_by_pin = index_by(target, |p| p.pin.clone());
    plan_indexed(&source_by_code, &target_by_pin, settings.name_max_len)
}

fn plan_indexed(source: &SourceIndex, target: &TargetIndex, max_len: usize) -> EmployeePlan {
    let diff = diff_keys(source, target, |_| false);
    EmployeePlan {
        to_create: diff
            .to_create
            .iter()
            .filter_map(|code| source.get(code))
            .map(|employee| build_new_person(employee, max_len))
            .collect(),
        to_update: plan_updates(&diff.common, source, target, max_len),
        to_delete: diff.to_delete.into_iter().collect(),
    }
}

fn plan_updates(
    common: &BTreeSet<BusinessCode>,
    source: &SourceIndex,
    target: &TargetIndex,
    max_len: usize,
) -> Vec<TargetPerson> {
    common
        .iter()
        .filter_map(|code| plan_update(source.get(code)?, target.get(code)?, max_len))
        .collect()
}

/// Fetch both sides concurrently. Either failure aborts.
pub async fn fetch_employees(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
) -> Result<(Vec<SourceEmployee>, Vec<TargetPerson>), SyncError> {
    tracing::info!("retrieving CVSecurity persons and MetaContrata employees");
    tokio::try_join!(
        async {
            source
                .list_employees()
                .await
                .map_err(fetch_err(Side::Source, "employees"))
        },
        async {
            target
                .list_persons()
                .await
                .map_err(fetch_err(Side::Target, "persons"))
        },
    )
}

/// Fetch both sides and plan, without writing.
pub async fn fetch_and_plan(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
    settings: &SyncSettings,
) -> Result<EmployeePlan, SyncError> {
    let (employees, persons) = fetch_employees(source, target).await?;
    Ok(plan_employees(employees, persons, settings))
}

/// Make CVSecurity's persons mirror MetaContrata's employees.
///
/// Returns `Err` when an initial fetch or the post-create refresh fails. A
/// failed batch stops the rest of its phase, is recorded in the report, and
/// later phases still run.
pub async fn reconcile_employees(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
    settings: &SyncSettings,
    dry_run: bool,
) -> Result<EmployeeReport, SyncError> {
    let max_len = settings.name_max_len;
    let (employees, persons) = fetch_employees(source, target).await?;
    let source_by_code = index_by(employees, |e| e.code.clone());
    let target_by_pin = index_by(persons, |p| p.pin.clone());
    let plan = plan_indexed(&source_by_code, &target_by_pin, max_len);

    if dry_run {
        log_dry_run(&plan);
        return Ok(EmployeeReport {
            dry_run: true,
            created: plan.to_create.len(),
            updated: plan.to_update.len(),
            deleted: plan.to_delete.len(),
            failures: Vec::new(),
        });
    }

    let EmployeePlan {
        to_create,
        mut to_update,
        to_delete,
    } = plan;
    let mut report = EmployeeReport::default();
    let batch_size = settings.batch_size;

    let created_any = !to_create.is_empty();
    let create_ok = run_phase(
        Phase::Create,
        to_create,
        batch_size,
        &mut report,
        move |chunk: Vec<TargetPerson>| async move {
            target.bulk_create_or_update_persons(&chunk).await
        },
    )
    .await;

    // New persons come back with server-side defaults; diff updates against those.
    if create_ok && created_any {
        tracing::info!("refreshing CVSecurity persons after create");
        let refreshed = target
            .list_persons()
            .await
            .map_err(fetch_err(Side::Target, "persons"))?;
        let refreshed_by_pin = index_by(refreshed, |p| p.pin.clone());
        let common = diff_keys(&source_by_code, &refreshed_by_pin, |_| false).common;
        to_update = plan_updates(&common, &source_by_code, &refreshed_by_pin, max_len);
    }

    run_phase(
        Phase::Update,
        to_update,
        batch_size,
        &mut report,
        move |chunk: Vec<TargetPerson>| async move {
            target.bulk_create_or_update_persons(&chunk).await
        },
    )
    .await;

    run_phase(
        Phase::Delete,
        to_delete,
        batch_size,
        &mut report,
        move |pins: Vec<BusinessCode>| async move { target.bulk_delete_persons(&pins).await },
    )
    .await;

    Ok(report)
}

/// Run one write phase in batches. Returns `false` if a batch failed.
async fn run_phase<T, F, Fut>(
    phase: Phase,
    items: Vec<T>,
    batch_size: usize,
    report: &mut EmployeeReport,
    operation: F,
) -> bool
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = ServiceResult<()>>,
{
    if items.is_empty() {
        tracing::info!(%phase, "no persons to {phase}");
        return true;
    }

    let span = tracing::info_span!("persons", %phase, count = items.len());
    let result = async {
        tracing::info!("applying person changes");
        run_in_batches(items, batch_size, operation).await
    }
    .instrument(span)
    .await;

    let (applied, ok) = match result {
        Ok(outcome) => (outcome.items, true),
        Err(failure) => {
            tracing::error!(
                %phase,
                batch = failure.batch,
                applied = failure.applied.batches,
                error = %failure.error,
                "person batch failed; skipping the rest of this phase",
            );
            report.failures.push(SyncError::Batch {
                phase,
                batch: failure.batch,
                applied: failure.applied.batches,
                source: failure.error,
            });
            (failure.applied.items, false)
        }
    };

    match phase {
        Phase::Create => report.created += applied,
        Phase::Update => report.updated += applied,
        Phase::Delete => report.deleted += applied,
    }
    ok
}

fn log_dry_run(plan: &EmployeePlan) {
    for person in &plan.to_create {
        tracing::info!(
            pin = %person.pin,
            name = %person.name,
            last_name = %person.last_name,
            "[dry-run] would create person",
        );
    }
    for person in &plan.to_update {
        tracing::info!(
            pin = %person.pin,
            name = %person.name,
            last_name = %person.last_name,
            disabled = ?person.is_disabled,
            "[dry-run] would update person",
        );
    }
    for pin in &plan.to_delete {
        tracing::info!(%pin, "[dry-run] would delete person");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
