pub mod environment;

pub use environment::select_environment;
