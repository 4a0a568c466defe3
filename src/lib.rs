// Library for tests to access modules

pub mod aggregate;
pub mod chain;
pub mod config;
pub mod decode;
pub mod models;
pub mod registry;
pub mod routes;
pub mod version;
pub mod worker;
