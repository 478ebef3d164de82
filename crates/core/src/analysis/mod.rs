pub mod manipulation;
pub mod returns;
pub mod sizing;
