//! Tokenization (spec §1's non-goal: "how raw text is tokenized is a host
//! concern"). [`Tokenizer`] is the seam `execute_string` dispatches through;
//! [`DefaultTokenizer`] is a convenience whitespace/quote-aware
//! implementation, not a mandated one.

/// Splits a command-line-shaped string into tokens for
/// [`crate::manager::Manager::execute_string`].
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, input: &str) -> Vec<String>;
}

/// Splits on whitespace, honoring single and double quotes as a way to
/// embed whitespace in a single token. Unterminated quotes take the rest of
/// the input as-is rather than erroring, since tokenization failures are
/// outside this crate's error taxonomy.
pub struct DefaultTokenizer;

impl Tokenizer for DefaultTokenizer {
    fn tokenize(&self, input: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut in_token = false;
        let mut quote: Option<char> = None;
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => current.push(c),
                None if c == '\'' || c == '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                None if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                None => {
                    current.push(c);
                    in_token = true;
                }
            }
        }
        if in_token {
            tokens.push(current);
        }
        tokens
    }
}
