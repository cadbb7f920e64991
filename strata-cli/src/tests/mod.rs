//! Shared test harness modules for the Strata CLI.

use super::*;

mod batch_unit;
mod helpers;
