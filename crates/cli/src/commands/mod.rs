//! CLI Commands

pub mod alert;
pub mod api;
pub mod config;
pub mod convert;
pub mod explore;
pub mod fixtures;
pub mod lab;
pub mod probe;
pub mod run;
