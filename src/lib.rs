//! lanefx: a script-driven lane effect processor for KSH chart files.

pub mod chart;
pub mod config;
pub mod error;
pub mod interp;
pub mod script;
pub mod zoom;

pub use chart::export::Export;
pub use chart::{Chart, Tick};
pub use config::Config;
pub use error::{Error, Result};
pub use interp::{Interpreter, Options, Summary};
pub use script::Script;
