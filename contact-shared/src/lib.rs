#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Environment loading and validated configuration for the Contact API.

pub mod config;
