//! Integration tests driving the assembled pipeline

mod notification_tests;
mod pipeline_tests;
mod scheduling_tests;
