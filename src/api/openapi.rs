//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{attendance, dashboard, health, labs, library, scan, students},
    models,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Access API",
        version = "0.1.0",
        description = "RFID attendance, library and lab lending REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Scanner
        scan::scan,
        scan::latest_scan,
        // Students
        students::list_students,
        students::register_student,
        students::get_student,
        students::update_student,
        students::delete_student,
        students::student_borrows,
        // Attendance
        attendance::list_attendance,
        attendance::today_attendance,
        attendance::update_zone,
        dashboard::stats,
        // Library
        library::list_books,
        library::create_book,
        library::get_book,
        library::update_book,
        library::delete_book,
        library::list_borrows,
        library::get_borrow,
        library::borrow_book,
        library::extend_borrow,
        library::return_borrow,
        library::pay_fine,
        // Labs
        labs::list_apparatus,
        labs::create_apparatus,
        labs::get_apparatus,
        labs::update_apparatus,
        labs::delete_apparatus,
        labs::list_borrows,
        labs::get_borrow,
        labs::borrow_apparatus,
        labs::return_borrow,
        labs::pay_fine,
    ),
    components(
        schemas(
            // Students
            models::student::Student,
            models::student::StudentShort,
            models::student::CreateStudent,
            models::student::UpdateStudent,
            students::StudentListResponse,
            students::StudentResponse,
            students::StudentBorrowsResponse,
            // Attendance
            models::attendance::ScanAction,
            models::attendance::ScanRequest,
            models::attendance::ScanOutcome,
            models::attendance::AttendanceLog,
            models::attendance::AttendancePage,
            models::attendance::UpdateZone,
            crate::services::scan_buffer::LastScan,
            scan::LatestScanResponse,
            attendance::TodayResponse,
            attendance::LogResponse,
            models::dashboard::DashboardStats,
            models::dashboard::HourlyBucket,
            models::dashboard::ZonePresence,
            models::dashboard::LendingStats,
            // Catalog
            models::book::Book,
            models::book::CreateBook,
            models::book::UpdateBook,
            models::apparatus::Apparatus,
            models::apparatus::CreateApparatus,
            models::apparatus::UpdateApparatus,
            library::BookListResponse,
            library::BookResponse,
            labs::ApparatusListResponse,
            labs::ApparatusResponse,
            // Loans
            models::loan::LoanStatus,
            models::loan::CreateLoan,
            models::loan::ReturnLoan,
            models::loan::BookLoanView,
            models::loan::ApparatusLoanView,
            library::BorrowListResponse,
            library::BorrowResponse,
            labs::LabBorrowListResponse,
            labs::LabBorrowResponse,
            // Common
            health::HealthResponse,
            super::MessageBody,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "scan", description = "RFID scanner"),
        (name = "students", description = "Student registry"),
        (name = "attendance", description = "Attendance logs"),
        (name = "dashboard", description = "Dashboard statistics"),
        (name = "library", description = "Books and book borrows"),
        (name = "labs", description = "Lab apparatus and apparatus borrows")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
