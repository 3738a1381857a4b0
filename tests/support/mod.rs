#![allow(dead_code)]

pub mod csv;
pub mod gridsurv_env;
