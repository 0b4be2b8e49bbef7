pub mod clock;
pub mod reminder;
pub mod ticker;
