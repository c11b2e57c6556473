pub mod category;
pub mod timer;
