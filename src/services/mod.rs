pub mod classifier;
pub mod evaluation;
pub mod gate;
pub mod language;
pub mod pipeline;
pub mod rating;
pub mod session;
pub mod session_store;
pub mod tier;
pub mod view;
