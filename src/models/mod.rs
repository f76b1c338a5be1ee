mod ab_test;
mod admin;
mod audit_log;
mod gtm;
mod lead;
mod page;
mod visitor;
mod webhook;

pub use ab_test::*;
pub use admin::*;
pub use audit_log::*;
pub use gtm::*;
pub use lead::*;
pub use page::*;
pub use visitor::*;
pub use webhook::*;
