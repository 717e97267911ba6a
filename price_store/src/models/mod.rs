pub mod bar;
pub mod date_range;
