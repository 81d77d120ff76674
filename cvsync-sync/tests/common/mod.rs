//! In-memory MetaContrata and CVSecurity doubles.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use cvsync_core::{BusinessCode, SourceDepartment, SourceEmployee, TargetDepartment, TargetPerson};
use cvsync_sync::{ServiceResult, SourceDirectory, TargetDirectory};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn source_department(code: &str, name: &str) -> SourceDepartment {
    SourceDepartment {
        code: code.into(),
        name: name.into(),
    }
}

pub fn target_department(code: &str, name: &str) -> TargetDepartment {
    TargetDepartment {
        code: code.into(),
        name: name.into(),
    }
}

pub fn employee(
    code: &str,
    first: &str,
    surname1: &str,
    surname2: &str,
    allowed: bool,
) -> SourceEmployee {
    SourceEmployee {
        code: code.into(),
        first_name: first.into(),
        surname1: surname1.into(),
        surname2: surname2.into(),
        department_code: "7".into(),
        access_allowed: allowed,
    }
}

pub fn person(pin: &str, name: &str, last_name: &str, disabled: Option<bool>) -> TargetPerson {
    TargetPerson {
        pin: pin.into(),
        dept_code: "7".into(),
        name: name.into(),
        last_name: last_name.into(),
        is_disabled: disabled,
    }
}

pub fn codes(items: &[&str]) -> Vec<BusinessCode> {
    items.iter().map(|c| BusinessCode::from(*c)).collect()
}

// ---------------------------------------------------------------------------
// MetaContrata
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeMeta {
    pub departments: Vec<SourceDepartment>,
    pub employees: Vec<SourceEmployee>,
    pub fail_departments: bool,
    pub fail_employees: bool,
    /// When set, every listing call waits here before answering.
    pub barrier: Option<Arc<Barrier>>,
}

#[async_trait]
impl SourceDirectory for FakeMeta {
    async fn list_business_units(&self) -> ServiceResult<Vec<SourceDepartment>> {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail_departments {
            return Err("MetaContrata unavailable".into());
        }
        Ok(self.departments.clone())
    }

    async fn list_employees(&self) -> ServiceResult<Vec<SourceEmployee>> {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail_employees {
            return Err("MetaContrata unavailable".into());
        }
        Ok(self.employees.clone())
    }
}

// ---------------------------------------------------------------------------
// CVSecurity
// ---------------------------------------------------------------------------

/// Every call the fake CVSecurity received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListDepartments,
    CreateDepartment(BusinessCode),
    DeleteDepartment(BusinessCode),
    ListPersons,
    UpsertPersons(Vec<BusinessCode>),
    DeletePersons(Vec<BusinessCode>),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::ListDepartments | Call::ListPersons)
    }
}

#[derive(Default)]
pub struct CvState {
    pub departments: BTreeMap<BusinessCode, TargetDepartment>,
    pub persons: BTreeMap<BusinessCode, TargetPerson>,
    pub calls: Vec<Call>,
    /// Department writes for these codes fail.
    pub failing_departments: HashSet<BusinessCode>,
    pub fail_department_list: bool,
    /// 1-based index of the person list call that fails.
    pub fail_person_list_call: Option<usize>,
    /// 1-based index of the upsert call that fails.
    pub fail_upsert_call: Option<usize>,
    /// 1-based index of the bulk delete call that fails.
    pub fail_delete_call: Option<usize>,
    /// Persons that appear server-side alongside the first upsert.
    pub appear_on_first_upsert: Vec<TargetPerson>,
}

impl CvState {
    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

#[derive(Default)]
pub struct FakeCv {
    pub state: Mutex<CvState>,
    pub barrier: Option<Arc<Barrier>>,
}

impl FakeCv {
    pub fn with_departments(departments: Vec<TargetDepartment>) -> Self {
        let cv = Self::default();
        cv.edit(|s| {
            s.departments = departments.into_iter().map(|d| (d.code.clone(), d)).collect();
        });
        cv
    }

    pub fn with_persons(persons: Vec<TargetPerson>) -> Self {
        let cv = Self::default();
        cv.edit(|s| {
            s.persons = persons.into_iter().map(|p| (p.pin.clone(), p)).collect();
        });
        cv
    }

    pub fn edit(&self, f: impl FnOnce(&mut CvState)) {
        let mut state = self.state.lock().expect("fake state");
        f(&mut *state);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("fake state").calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn department_codes(&self) -> Vec<BusinessCode> {
        self.state.lock().expect("fake state").departments.keys().cloned().collect()
    }

    pub fn department(&self, code: &str) -> Option<TargetDepartment> {
        self.state
            .lock()
            .expect("fake state")
            .departments
            .get(&BusinessCode::from(code))
            .cloned()
    }

    pub fn person(&self, pin: &str) -> Option<TargetPerson> {
        self.state
            .lock()
            .expect("fake state")
            .persons
            .get(&BusinessCode::from(pin))
            .cloned()
    }

    pub fn person_count(&self) -> usize {
        self.state.lock().expect("fake state").persons.len()
    }

    async fn wait(&self) {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
    }
}

#[async_trait]
impl TargetDirectory for FakeCv {
    async fn list_departments(&self) -> ServiceResult<Vec<TargetDepartment>> {
        self.wait().await;
        let mut state = self.state.lock().expect("fake state");
        state.calls.push(Call::ListDepartments);
        if state.fail_department_list {
            return Err("CVSecurity unavailable".into());
        }
        Ok(state.departments.values().cloned().collect())
    }

    async fn create_or_update_department(
        &self,
        department: &TargetDepartment,
    ) -> ServiceResult<()> {
        let mut state = self.state.lock().expect("fake state");
        state.calls.push(Call::CreateDepartment(department.code.clone()));
        if state.failing_departments.contains(&department.code) {
            return Err(format!("department name '{}' rejected", department.name).into());
        }
        state
            .departments
            .insert(department.code.clone(), department.clone());
        Ok(())
    }

    async fn delete_department(&self, code: &BusinessCode) -> ServiceResult<()> {
        let mut state = self.state.lock().expect("fake state");
        state.calls.push(Call::DeleteDepartment(code.clone()));
        if state.failing_departments.contains(code) {
            return Err(format!("department {code} still has persons").into());
        }
        state.departments.remove(code);
        Ok(())
    }

    async fn list_persons(&self) -> ServiceResult<Vec<TargetPerson>> {
        self.wait().await;
        let mut state = self.state.lock().expect("fake state");
        state.calls.push(Call::ListPersons);
        let nth = state.count(|c| *c == Call::ListPersons);
        if state.fail_person_list_call == Some(nth) {
            return Err("person list timed out".into());
        }
        Ok(state.persons.values().cloned().collect())
    }

    async fn bulk_create_or_update_persons(&self, persons: &[TargetPerson]) -> ServiceResult<()> {
        let mut state = self.state.lock().expect("fake state");
        state
            .calls
            .push(Call::UpsertPersons(persons.iter().map(|p| p.pin.clone()).collect()));
        let nth = state.count(|c| matches!(c, Call::UpsertPersons(_)));
        if state.fail_upsert_call == Some(nth) {
            return Err("bulk upsert rejected".into());
        }
        for p in persons {
            // CVSecurity materializes an explicit `isDisabled: false` on create.
            let mut stored = p.clone();
            stored.is_disabled = stored.is_disabled.or(Some(false));
            state.persons.insert(stored.pin.clone(), stored);
        }
        if nth == 1 {
            for p in std::mem::take(&mut state.appear_on_first_upsert) {
                state.persons.insert(p.pin.clone(), p);
            }
        }
        Ok(())
    }

    async fn bulk_delete_persons(&self, pins: &[BusinessCode]) -> ServiceResult<()> {
        let mut state = self.state.lock().expect("fake state");
        state.calls.push(Call::DeletePersons(pins.to_vec()));
        let nth = state.count(|c| matches!(c, Call::DeletePersons(_)));
        if state.fail_delete_call == Some(nth) {
            return Err("bulk delete rejected".into());
        }
        for pin in pins {
            state.persons.remove(pin);
        }
        Ok(())
    }
}
