mod conversation;
mod document;
mod sanitize;
mod turn;

pub use conversation::*;
pub use document::*;
pub use sanitize::*;
pub use turn::*;
