pub mod fcc;
pub mod locast;
pub mod market;
pub mod scheduled;
pub mod station;
