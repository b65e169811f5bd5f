pub mod server;

pub use server::{AppServices, run_server};
