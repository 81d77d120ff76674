//! `cvsync diff`: fetch both systems and show the planned writes.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use cvsync_sync::{department, employee, DepartmentPlan, EmployeePlan};

use super::{connect, load_config, runtime};

/// Arguments for `cvsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Emit the plans as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Plans {
    departments: DepartmentPlan,
    employees: EmployeePlan,
}

impl DiffArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;

        let plans = runtime()?.block_on(async {
            let (meta, cv) = connect(&config).await?;
            let departments = department::fetch_and_plan(&meta, &cv, &config.sync)
                .await
                .context("failed to plan departments")?;
            let employees = employee::fetch_and_plan(&meta, &cv, &config.sync)
                .await
                .context("failed to plan employees")?;
            anyhow::Ok(Plans {
                departments,
                employees,
            })
        })?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plans).context("failed to serialize plans")?
            );
            return Ok(());
        }

        print_plans(&plans);
        Ok(())
    }
}

fn print_plans(plans: &Plans) {
    if plans.departments.is_empty() && plans.employees.is_empty() {
        println!("No differences.");
        return;
    }

    let d = &plans.departments;
    if !d.is_empty() {
        println!("{}", "DEPARTMENTS".bold());
        for dept in &d.to_create {
            println!("  {} {} {}", "+".green(), dept.code, dept.name);
        }
        for code in &d.to_delete {
            println!("  {} {code}", "-".red());
        }
    }

    let e = &plans.employees;
    if !e.is_empty() {
        println!("{}", "EMPLOYEES".bold());
        for person in &e.to_create {
            println!(
                "  {} {} {} {} (dept {})",
                "+".green(),
                person.pin,
                person.name,
                person.last_name,
                person.dept_code
            );
        }
        for person in &e.to_update {
            let access = if person.access_allowed() { "enabled" } else { "disabled" };
            println!(
                "  {} {} {} {} (dept {}, {access})",
                "~".yellow(),
                person.pin,
                person.name,
                person.last_name,
                person.dept_code
            );
        }
        for pin in &e.to_delete {
            println!("  {} {pin}", "-".red());
        }
    }

    println!(
        "{} department(s) to create, {} to delete; {} person(s) to create, {} to update, {} to delete",
        d.to_create.len(),
        d.to_delete.len(),
        e.to_create.len(),
        e.to_update.len(),
        e.to_delete.len(),
    );
}
