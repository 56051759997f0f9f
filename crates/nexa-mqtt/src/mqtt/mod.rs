pub mod bus;
pub mod discovery;
pub mod sink;
pub mod topics;

pub use discovery::Discovery;
pub use sink::MqttSink;
pub use topics::Topics;
