pub mod audio;
pub mod config;
pub mod director;
pub mod input_gate;
pub mod interaction;
pub mod motion;
pub mod presentation;
pub mod scheduler;
pub mod script;
