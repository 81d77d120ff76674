//! Capability traits for the two remote systems.
//!
//! The engine never sees HTTP; `cvsync-clients` implements these for the real
//! APIs and tests implement them in memory.

use async_trait::async_trait;

use cvsync_core::{BusinessCode, SourceDepartment, SourceEmployee, TargetDepartment, TargetPerson};

/// Opaque failure from a remote call.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Read-only view of MetaContrata.
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// Every subcontractor, mirrored as a CV department.
    async fn list_business_units(&self) -> ServiceResult<Vec<SourceDepartment>>;

    async fn list_employees(&self) -> ServiceResult<Vec<SourceEmployee>>;
}

/// Read/write view of CVSecurity.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    async fn list_departments(&self) -> ServiceResult<Vec<TargetDepartment>>;

    async fn create_or_update_department(&self, department: &TargetDepartment)
        -> ServiceResult<()>;

    async fn delete_department(&self, code: &BusinessCode) -> ServiceResult<()>;

    async fn list_persons(&self) -> ServiceResult<Vec<TargetPerson>>;

    /// Upsert one batch of persons in a single call.
    async fn bulk_create_or_update_persons(&self, persons: &[TargetPerson]) -> ServiceResult<()>;

    /// Delete one batch of persons by pin in a single call.
    async fn bulk_delete_persons(&self, pins: &[BusinessCode]) -> ServiceResult<()>;
}
