//! Test optimization client for Rust test harnesses
//!
//! Drives a test optimization engine (native or in-memory) through a fixed
//! entity hierarchy: session, module, suite, test and custom spans.
//!
//! # Quick Start
//!
//! ```no_run
//! use test_optimization::{TestOptimization, TestStatus};
//!
//! TestOptimization::init()?;
//! let mut session = TestOptimization::create_session(Some("libtest"), None)?;
//! let mut module = session.create_module("my_crate", "libtest", "1.0")?;
//! let mut suite = module.create_test_suite("parser")?;
//!
//! let mut test = suite.create_test("parses_empty_input")?;
//! test.close(TestStatus::Pass)?;
//!
//! suite.close()?;
//! module.close()?;
//! session.close(0)?;
//! TestOptimization::shutdown()?;
//! # Ok::<(), test_optimization::Error>(())
//! ```
//!
//! Everything here is re-exported from `topt-sdk`.

pub use topt_sdk::*;
