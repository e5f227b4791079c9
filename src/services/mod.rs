//! Business logic services

pub mod attendance;
pub mod catalog;
pub mod dashboard;
pub mod loans;
pub mod policy;
pub mod scan_buffer;
pub mod students;

use crate::{config::AppConfig, repository::Repository};

use policy::{ApparatusKind, BookKind};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub students: students::StudentsService,
    pub attendance: attendance::AttendanceService,
    pub catalog: catalog::CatalogService,
    pub book_loans: loans::LoansService<BookKind>,
    pub apparatus_loans: loans::LoansService<ApparatusKind>,
    pub dashboard: dashboard::DashboardService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let students = students::StudentsService::new(repository.clone());
        let scan_buffer = scan_buffer::ScanBuffer::new(config.scan_buffer.ttl_seconds);

        Self {
            attendance: attendance::AttendanceService::new(
                repository.clone(),
                students.clone(),
                scan_buffer,
                config.attendance.clone(),
            ),
            catalog: catalog::CatalogService::new(repository.clone()),
            book_loans: loans::LoansService::new(
                repository.clone(),
                repository.book_loans.clone(),
                &config.loans,
            ),
            apparatus_loans: loans::LoansService::new(
                repository.clone(),
                repository.apparatus_loans.clone(),
                &config.loans,
            ),
            dashboard: dashboard::DashboardService::new(repository.clone()),
            students,
            repository,
        }
    }
}
