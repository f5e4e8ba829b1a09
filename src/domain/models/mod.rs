mod chunk;
mod embedding;
mod search_result;

pub use chunk::*;
pub use embedding::*;
pub use search_result::*;
