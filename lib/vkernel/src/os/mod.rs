pub mod exec;
pub mod fd;
pub mod task;
