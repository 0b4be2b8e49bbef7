pub mod draft;
pub mod task;
pub mod timefmt;
