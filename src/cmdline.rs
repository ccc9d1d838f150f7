//! Command-line tokenization for `pipe-open`.
//!
//! The launcher receives one full command-line string and needs an argv for
//! `exec`. Splitting follows shell word rules: whitespace separates words,
//! single quotes preserve everything literally, double quotes preserve
//! everything except backslash escapes, a bare backslash escapes the next
//! character.

use crate::error::{Error, Result};

/// Split a command line into argv words.
///
/// # Errors
///
/// `SpawnError` on an unterminated quote or a trailing backslash.
pub fn split(cmdline: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = cmdline.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => {
                            return Err(Error::Spawn("unterminated single quote".into()))
                        }
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => current.push(c),
                            None => {
                                return Err(Error::Spawn(
                                    "unterminated double quote".into(),
                                ))
                            }
                        },
                        Some(c) => current.push(c),
                        None => {
                            return Err(Error::Spawn("unterminated double quote".into()))
                        }
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(Error::Spawn("trailing backslash".into())),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(split("echo hi there").unwrap(), ["echo", "hi", "there"]);
    }

    #[test]
    fn test_single_quotes_literal() {
        assert_eq!(
            split(r#"grep 'a "b" \n c'"#).unwrap(),
            ["grep", r#"a "b" \n c"#]
        );
    }

    #[test]
    fn test_double_quotes_with_escape() {
        assert_eq!(split(r#"echo "say \"hi\"""#).unwrap(), ["echo", r#"say "hi""#]);
    }

    #[test]
    fn test_backslash_escapes_space() {
        assert_eq!(split(r"ls my\ file").unwrap(), ["ls", "my file"]);
    }

    #[test]
    fn test_empty_quoted_word_survives() {
        assert_eq!(split(r#"prog '' x"#).unwrap(), ["prog", "", "x"]);
    }

    #[test]
    fn test_empty_line_is_empty_argv() {
        assert!(split("   ").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_spawn_error() {
        assert!(matches!(split("echo 'oops"), Err(Error::Spawn(_))));
        assert!(matches!(split("echo \"oops"), Err(Error::Spawn(_))));
    }

    #[test]
    fn test_trailing_backslash_is_spawn_error() {
        assert!(matches!(split("echo x\\"), Err(Error::Spawn(_))));
    }
}
