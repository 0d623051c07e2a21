pub mod generator;
pub mod handlers;
pub mod normalize;
pub mod orchestrator;
pub mod prompts;
pub mod refresh;
pub mod repair;
