//! Reading cells out of an Arrow record batch and turning them into grid cells.

pub mod cells;
pub mod table;
