//! Department reconciliation.
//!
//! MetaContrata subcontractors become CVSecurity departments. Only presence
//! drives writes: a department is created when its code is new and deleted
//! when its code disappeared. Names of existing departments are never touched.
//!
//! CVSecurity refuses duplicate department names, so every created name embeds
//! its code: `"{code}-{alphanumeric name}"`.

use serde::Serialize;

use cvsync_core::{
    clean_string, BusinessCode, CleanMode, SourceDepartment, SyncSettings, TargetDepartment,
};

use crate::diff::{diff_keys, index_by};
use crate::error::{fetch_err, serialize_errors, Phase, Side, SyncError};
use crate::service::{SourceDirectory, TargetDirectory};

/// The writes a department reconciliation would issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DepartmentPlan {
    pub to_create: Vec<TargetDepartment>,
    pub to_delete: Vec<BusinessCode>,
}

impl DepartmentPlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Outcome of [`reconcile_departments`]. In dry-run mode the code lists hold
/// what would have been written.
#[derive(Debug, Default, Serialize)]
pub struct DepartmentReport {
    pub dry_run: bool,
    pub created: Vec<BusinessCode>,
    pub deleted: Vec<BusinessCode>,
    /// Per-item write failures; each one was logged and skipped.
    #[serde(serialize_with = "serialize_errors")]
    pub failures: Vec<SyncError>,
}

impl DepartmentReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The CVSecurity name for a subcontractor.
pub fn department_name(code: &BusinessCode, source_name: &str) -> String {
    format!("{code}-{}", clean_string(source_name, CleanMode::Alphanumeric))
}

/// Fetch both sides concurrently. Either failure aborts.
pub async fn fetch_departments(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
) -> Result<(Vec<SourceDepartment>, Vec<TargetDepartment>), SyncError> {
    tracing::info!("retrieving CVSecurity departments and MetaContrata subcontractors");
    tokio::try_join!(
        async {
            source
                .list_business_units()
                .await
                .map_err(fetch_err(Side::Source, "subcontractors"))
        },
        async {
            target
                .list_departments()
                .await
                .map_err(fetch_err(Side::Target, "departments"))
        },
    )
}

/// Compute the department writes. Pure; the reserved code is ignored on both sides.
pub fn plan_departments(
    source: Vec<SourceDepartment>,
    target: Vec<TargetDepartment>,
    settings: &SyncSettings,
) -> DepartmentPlan {
    let reserved = &settings.reserved_department_code;
    let source_by_code = index_by(source, |d| d.code.clone());
    let target_by_code = index_by(
        target.into_iter().filter(|d| &d.code != reserved),
        |d| d.code.clone(),
    );

    let diff = diff_keys(&source_by_code, &target_by_code, |code| code == reserved);

    let to_create = diff
        .to_create
        .iter()
        .filter_map(|code| source_by_code.get(code))
        .map(|dept| TargetDepartment {
            code: dept.code.clone(),
            name: department_name(&dept.code, &dept.name),
        })
        .collect();

    DepartmentPlan {
        to_create,
        to_delete: diff.to_delete.into_iter().collect(),
    }
}

/// Fetch both sides and plan, without writing.
pub async fn fetch_and_plan(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
    settings: &SyncSettings,
) -> Result<DepartmentPlan, SyncError> {
    let (source_departments, target_departments) = fetch_departments(source, target).await?;
    Ok(plan_departments(source_departments, target_departments, settings))
}

/// Make CVSecurity's department list mirror MetaContrata's subcontractors.
///
/// Returns `Err` only when fetching fails. Individual write failures are
/// logged, collected in the report, and do not stop the remaining writes.
pub async fn reconcile_departments(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
    settings: &SyncSettings,
    dry_run: bool,
) -> Result<DepartmentReport, SyncError> {
    let plan = fetch_and_plan(source, target, settings).await?;
    let mut report = DepartmentReport {
        dry_run,
        ..DepartmentReport::default()
    };

    if dry_run {
        for dept in &plan.to_create {
            tracing::info!(code = %dept.code, name = %dept.name, "[dry-run] would create department");
        }
        for code in &plan.to_delete {
            tracing::info!(%code, "[dry-run] would delete department");
        }
        report.created = plan.to_create.into_iter().map(|d| d.code).collect();
        report.deleted = plan.to_delete;
        return Ok(report);
    }

    apply_plan(target, plan, &mut report).await;
    Ok(report)
}

async fn apply_plan(
    target: &dyn TargetDirectory,
    plan: DepartmentPlan,
    report: &mut DepartmentReport,
) {
    if plan.to_create.is_empty() {
        tracing::info!("no new departments to create");
    } else {
        tracing::info!(count = plan.to_create.len(), "creating departments");
        for dept in plan.to_create {
            match target.create_or_update_department(&dept).await {
                Ok(()) => report.created.push(dept.code),
                Err(source) => {
                    tracing::error!(
                        code = %dept.code,
                        name = %dept.name,
                        error = %source,
                        "failed to create department",
                    );
                    report.failures.push(SyncError::Write {
                        phase: Phase::Create,
                        code: dept.code,
                        source,
                    });
                }
            }
        }
    }

    if plan.to_delete.is_empty() {
        tracing::info!("no departments to delete");
    } else {
        tracing::info!(count = plan.to_delete.len(), "deleting departments");
        for code in plan.to_delete {
            match target.delete_department(&code).await {
                Ok(()) => report.deleted.push(code),
                Err(source) => {
                    tracing::error!(%code, error = %source, "failed to delete department");
                    report.failures.push(SyncError::Write {
                        phase: Phase::Delete,
                        code,
                        source,
                    });
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn src(code: &str, name: &str) -> SourceDepartment {
        SourceDepartment {
            code: code.into(),
            name: name.into(),
        }
    }

    fn tgt(code: &str, name: &str) -> TargetDepartment {
        TargetDepartment {
            code: code.into(),
            name: name.into(),
        }
    }

    #[test]
    fn created_name_embeds_code() {
        assert_eq!(department_name(&"7".into(), "North Hub"), "7-North Hub");
        assert_eq!(department_name(&"12".into(), "Acme, S.L. (Sur)"), "12-Acme SL Sur");
    }

    #[test]
    fn plan_creates_new_and_deletes_missing() {
        let plan = plan_departments(
            vec![src("7", "North Hub"), src("8", "South")],
            vec![tgt("8", "8-South"), tgt("9", "9-Gone")],
            &SyncSettings::default(),
        );
        assert_eq!(plan.to_create, vec![tgt("7", "7-North Hub")]);
        assert_eq!(plan.to_delete, vec![BusinessCode::from("9")]);
    }

    #[test]
    fn reserved_code_is_never_planned() {
        let plan = plan_departments(
            vec![src("1", "Would clobber default")],
            vec![tgt("1", "Default")],
            &SyncSettings::default(),
        );
        assert!(plan.is_empty());

        let plan = plan_departments(vec![], vec![tgt("1", "Default")], &SyncSettings::default());
        assert!(plan.to_delete.is_empty());

        let plan = plan_departments(vec![src("1", "x")], vec![], &SyncSettings::default());
        assert!(plan.to_create.is_empty());
    }

    #[test]
    fn renamed_source_department_is_left_alone() {
        let plan = plan_departments(
            vec![src("7", "New Name")],
            vec![tgt("7", "7-Old Name")],
            &SyncSettings::default(),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn reserved_code_follows_settings() {
        let settings = SyncSettings {
            reserved_department_code: "DEFAULT".into(),
            ..SyncSettings::default()
        };
        let plan = plan_departments(vec![], vec![tgt("DEFAULT", "x"), tgt("1", "y")], &settings);
        assert_eq!(plan.to_delete, vec![BusinessCode::from("1")]);
    }
}
