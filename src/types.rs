pub mod channels;
pub mod push;
