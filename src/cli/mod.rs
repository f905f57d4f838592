mod handler;
mod output;

pub use handler::{join_words, parse_line, Command, Invocation, RecordKind};
pub use output::{render, render_notice};
