//! Host-environment helpers shared by the native and browser builds.

pub mod time;
