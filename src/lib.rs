pub mod context;
pub mod coordinator;
pub mod diff;
pub mod health;
pub mod path_classifier;
pub mod providers;
pub mod scanners;
pub mod scorer;
pub mod shared;
