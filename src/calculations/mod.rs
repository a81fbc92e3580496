pub mod crew_hours;
pub mod rollup;
