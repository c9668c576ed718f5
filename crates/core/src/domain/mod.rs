pub mod citation;
pub mod invocation;
pub mod query;
pub mod writeback;
