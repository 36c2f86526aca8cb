// Library for tests and both binaries to access modules

pub mod config;
pub mod history_repo;
pub mod logging;
pub mod models;
pub mod routes;
pub mod shutdown;
pub mod simulator;
pub mod state;
pub mod sync_service;
