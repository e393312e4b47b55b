pub mod tasks;
pub mod watermark;
