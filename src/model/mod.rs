pub mod attendance;
pub mod client;
pub mod daily_report;
pub mod employee;
pub mod employee_image;
pub mod filial;
pub mod position;
pub mod role;
pub mod user;
pub mod working_graphic;
