pub mod controller;
pub mod report;
