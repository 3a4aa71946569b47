use crate::analytics::commers::{
    CommerEntry, CommerStatus, DayCommers, EmployeeMonth, MonthCommers, MonthStats,
};
use crate::api::attendance::{AttendanceListResponse, AttendanceRecord, AttendanceUploadForm};
use crate::api::client::{ClientDetails, ClientListResponse, ClientSighting, RebuildRequest};
use crate::api::employee::{
    AttendanceDay, CreateEmployee, EmployeeDetails, EmployeeGraphic, EmployeeListResponse,
    EmployeeMonthView,
};
use crate::api::employee_image::{ImageListResponse, ImageUploadForm};
use crate::api::filial::{
    CreateFilial, FilialDayCommers, FilialEmployee, FilialListResponse, FilialMonthCommers,
    FilialRef, FilialView,
};
use crate::api::position::{CreatePosition, PositionListResponse, PositionWithCount};
use crate::api::user::{CreateUser, UserListResponse};
use crate::api::working_graphic::{
    CreateWorkingGraphic, DayInput, UpdateWorkingGraphic, WorkingGraphicDetails,
    WorkingGraphicListResponse,
};
use crate::api::NamedRef;
use crate::model::client::{Client, ClientVisit};
use crate::model::daily_report::{DailyReport, TimeSlot};
use crate::model::employee::Employee;
use crate::model::employee_image::EmployeeImageView;
use crate::model::filial::Filial;
use crate::model::position::Position;
use crate::model::user::User;
use crate::model::working_graphic::{Day, Weekday, WorkingGraphic};
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

/// Registers the `bearer_auth` scheme referenced by protected paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance HR API",
        version = "1.0.0",
        description = r#"
## Attendance & HR backend

Backend for a small business with several **filials**. Face-recognition
devices push employee check-ins and walk-in client sightings; HR staff manage
employees, schedules and read the analytics.

### 🔹 Key Features
- **Organisation**: positions, filials and weekly working graphics
- **Employees**: profiles, images and a monthly attendance view
- **Attendance**: device check-ins with snapshots
- **Commers**: on-time / late / absent split per filial, daily and monthly
- **Clients**: walk-in sightings and daily demographic reports

### 🔐 Security
Everything under `/api/v1` requires a **JWT Bearer** access token.
Devices authenticate as System/ApiUser accounts.

### 📦 Response Format
- JSON bodies, errors as `{"message": "..."}`
- `page` / `per_page` pagination on list endpoints
- Stored images are served under `/storage`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::position::create_position,
        crate::api::position::list_positions,
        crate::api::position::get_position,
        crate::api::position::update_position,
        crate::api::position::delete_position,

        crate::api::filial::create_filial,
        crate::api::filial::list_filials,
        crate::api::filial::get_filial,
        crate::api::filial::update_filial,
        crate::api::filial::delete_filial,
        crate::api::filial::filial_attendance,
        crate::api::filial::filial_day_commers,
        crate::api::filial::all_day_commers,
        crate::api::filial::filial_month_commers,

        crate::api::working_graphic::create_working_graphic,
        crate::api::working_graphic::list_working_graphics,
        crate::api::working_graphic::get_working_graphic,
        crate::api::working_graphic::update_working_graphic,
        crate::api::working_graphic::delete_working_graphic,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::employee_attendance,

        crate::api::employee_image::upload_image,
        crate::api::employee_image::list_all_images,
        crate::api::employee_image::list_employee_images,
        crate::api::employee_image::get_image,
        crate::api::employee_image::replace_image,
        crate::api::employee_image::delete_image,

        crate::api::attendance::create_attendance,
        crate::api::attendance::list_attendance,
        crate::api::attendance::get_attendance,
        crate::api::attendance::delete_attendance,
        crate::api::attendance::my_attendance,

        crate::api::client::create_client,
        crate::api::client::list_clients,
        crate::api::client::get_client,
        crate::api::client::get_daily_report,
        crate::api::client::list_daily_reports,
        crate::api::client::rebuild_daily_reports
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            User,
            CreateUser,
            UserListResponse,
            NamedRef,
            Position,
            CreatePosition,
            PositionWithCount,
            PositionListResponse,
            Filial,
            CreateFilial,
            FilialEmployee,
            FilialView,
            FilialListResponse,
            FilialRef,
            FilialDayCommers,
            FilialMonthCommers,
            WorkingGraphic,
            Day,
            Weekday,
            DayInput,
            CreateWorkingGraphic,
            UpdateWorkingGraphic,
            WorkingGraphicDetails,
            WorkingGraphicListResponse,
            Employee,
            CreateEmployee,
            EmployeeGraphic,
            EmployeeDetails,
            EmployeeListResponse,
            AttendanceDay,
            EmployeeMonthView,
            EmployeeImageView,
            ImageUploadForm,
            ImageListResponse,
            AttendanceUploadForm,
            AttendanceRecord,
            AttendanceListResponse,
            CommerStatus,
            CommerEntry,
            DayCommers,
            MonthStats,
            EmployeeMonth,
            MonthCommers,
            Client,
            ClientVisit,
            ClientSighting,
            ClientDetails,
            ClientListResponse,
            TimeSlot,
            DailyReport,
            RebuildRequest
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "User", description = "User administration (admin only)"),
        (name = "Position", description = "Job positions"),
        (name = "Filial", description = "Filials and their attendance"),
        (name = "Commers", description = "On-time / late / absent analytics"),
        (name = "WorkingGraphic", description = "Weekly working schedules"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "EmployeeImage", description = "Employee face images"),
        (name = "Attendance", description = "Device check-ins"),
        (name = "Client", description = "Walk-in client sightings"),
        (name = "DailyReport", description = "Daily client reports"),
    )
)]
pub struct ApiDoc;
