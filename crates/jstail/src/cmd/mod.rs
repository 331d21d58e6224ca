//! Command implementations for the jstail CLI

pub mod tail;
