#![cfg(unix)]

mod common;
mod pipeline_tests;
mod source_tests;
