//! Scheduler integration tests: scheduling, groups and trigger bindings
//! driven tick by tick through the public API.

mod integration;
