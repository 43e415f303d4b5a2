#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

pub mod cname;
pub mod count;
pub mod encode;
pub mod hwinfo;
pub mod types;
