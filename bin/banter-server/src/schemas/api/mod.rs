pub mod chat;
pub mod transcribe;
pub mod tts;
