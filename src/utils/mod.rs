pub mod db_utils;
pub mod email_index;
pub mod file_storage;
pub mod pagination;
pub mod schedule_cache;
pub mod time;
