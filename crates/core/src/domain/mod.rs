pub mod order;
pub mod returns;
