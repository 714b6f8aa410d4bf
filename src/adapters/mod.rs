pub mod csv_source;
pub mod discovery;
pub mod render;
