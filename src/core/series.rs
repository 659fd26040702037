mod fill;
mod resample;

pub use self::{fill::ForwardFill, resample::Resample};

pub type Point<K, V> = (K, V);
pub type Series<K, V> = Vec<Point<K, V>>;
