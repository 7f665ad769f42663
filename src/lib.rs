mod config;
mod effect;
mod endpoint;
mod error;
mod io;
mod reactor;
mod receiver;
mod sender;
mod seq;
mod session;
mod window;
mod wire;

pub use config::Config;
pub use effect::RudpEvent;
pub use endpoint::Endpoint;
pub use error::RudpError;
pub use io::{DatagramIo, UdpTransport};
