pub mod battery;
pub mod cycles;
pub mod formulation;
pub mod horizon;
pub mod physics;
pub mod prices;
pub mod probability;
pub mod schedule;
pub mod series;
pub mod solver;
pub mod sweep;
