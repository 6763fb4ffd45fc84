pub mod client;
pub mod reader;
pub mod sse;
pub mod utf8;
