mod answer_question;
mod build_index;
mod retrieve;

pub use answer_question::*;
pub use build_index::*;
pub use retrieve::*;
