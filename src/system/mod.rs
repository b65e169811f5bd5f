pub mod logging;
pub mod shutdown;

pub use logging::init_logging;
pub use shutdown::listen_for_shutdown;
