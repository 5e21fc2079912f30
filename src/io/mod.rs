//! Network file formats.

pub mod pandapower;
