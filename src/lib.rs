pub mod channel;
pub mod config;
pub mod io;
pub mod motion;
pub mod sensor;
pub mod skeleton;
pub mod system;
pub mod tracking;
