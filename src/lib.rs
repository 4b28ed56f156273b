pub mod annotate;
pub mod filter;
pub mod position;
pub mod stream;
pub mod table;
pub mod tempo;
