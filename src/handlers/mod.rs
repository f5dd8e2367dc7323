pub mod media_stream;
pub mod twiml;
