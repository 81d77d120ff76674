//! `cvsync sync`: run one reconciliation cycle and print what it did.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use cvsync_sync::{pipeline, CycleReport, DepartmentReport, EmployeeReport, SyncError, SyncScope};

use super::{connect, load_config, runtime};

/// Arguments for `cvsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Reconcile only one entity type: `departments` or `employees`.
    #[arg(long, value_name = "SCOPE")]
    pub only: Option<SyncScope>,

    /// Compute and print the writes without issuing them.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        cvsync_daemon::logging::init(&config.logging).context("failed to initialise logging")?;

        let scope = self.only.unwrap_or_default();
        let dry_run = self.dry_run;
        let report = runtime()?.block_on(async {
            let (meta, cv) = connect(&config).await?;
            anyhow::Ok(pipeline::run(&meta, &cv, &config.sync, scope, dry_run).await)
        })?;

        print_report(&report, dry_run);
        if !report.is_success() {
            bail!("sync finished with failures");
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "entity")]
    entity: &'static str,
    #[tabled(rename = "created")]
    created: usize,
    #[tabled(rename = "updated")]
    updated: String,
    #[tabled(rename = "deleted")]
    deleted: usize,
    #[tabled(rename = "failures")]
    failures: usize,
}

fn print_report(report: &CycleReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let mut rows = Vec::new();
    let mut errors: Vec<&SyncError> = Vec::new();

    match &report.departments {
        Some(Ok(r)) => {
            rows.push(department_row(r));
            errors.extend(&r.failures);
        }
        Some(Err(e)) => errors.push(e),
        None => {}
    }
    match &report.employees {
        Some(Ok(r)) => {
            rows.push(employee_row(r));
            errors.extend(&r.failures);
        }
        Some(Err(e)) => errors.push(e),
        None => {}
    }

    if report.is_success() {
        println!("{prefix}{} sync complete", "✓".green().bold());
    } else {
        println!("{prefix}{} sync finished with failures", "✗".red().bold());
    }

    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    for error in errors {
        println!("  {} {error}", "!".red().bold());
    }
}

fn department_row(report: &DepartmentReport) -> ReportRow {
    ReportRow {
        entity: "departments",
        created: report.created.len(),
        updated: "-".to_string(),
        deleted: report.deleted.len(),
        failures: report.failures.len(),
    }
}

fn employee_row(report: &EmployeeReport) -> ReportRow {
    ReportRow {
        entity: "employees",
        created: report.created,
        updated: report.updated.to_string(),
        deleted: report.deleted,
        failures: report.failures.len(),
    }
}
