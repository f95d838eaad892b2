use super::{Analyzer, Token};

/// Splits on non-alphanumerics and lowercases.
///
/// Keeps ASCII alphanumeric runs of length >= 1. `"A finite-state machine"`
/// tokenizes to `a`@0, `finite`@1, `state`@2, `machine`@3.
#[derive(Clone, Debug)]
pub struct StandardAnalyzer;

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;
        let mut run = String::new();
        for chr in text.chars() {
            if chr.is_ascii_alphanumeric() {
                run.push(chr.to_ascii_lowercase());
            } else if !run.is_empty() {
                tokens.push(Token {
                    text: std::mem::take(&mut run),
                    position,
                });
                position += 1;
            }
        }
        if !run.is_empty() {
            tokens.push(Token {
                text: run,
                position,
            });
        }
        tokens
    }
}
