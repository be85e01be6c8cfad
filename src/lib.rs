//! School climate questionnaires: institution lookup, role-specific
//! submissions, a client-side form model and read-side reporting.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod http;
pub mod models;
pub mod questions;
pub mod report;
pub mod score;
pub mod service;
