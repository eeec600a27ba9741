pub mod graph;
pub mod level;
pub mod level_monitor;
