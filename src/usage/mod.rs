pub mod empty_state;
pub mod filter;
pub mod invoke;
pub mod loader;
pub mod normalize;
pub mod periods;
pub mod pricing;
pub mod scanner;
pub mod types;
