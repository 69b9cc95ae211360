pub mod demo;
pub mod project;
