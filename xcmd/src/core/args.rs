//! Positional argument binding.

use std::collections::BTreeMap;

use crate::command::ArgSpec;
use crate::core::errors::MissingArgumentError;

/// Bind user tokens to declared arguments, in declaration order.
///
/// A non-rest argument consumes exactly one token. A rest argument consumes
/// every remaining token joined by single spaces (possibly none, yielding an
/// empty string). Extra tokens with no rest argument to absorb them are ignored.
pub fn bind_args(
    specs: &[ArgSpec],
    tokens: &[String],
) -> Result<BTreeMap<String, String>, MissingArgumentError> {
    let mut bound = BTreeMap::new();
    let mut next = 0usize;

    for spec in specs {
        if spec.rest {
            let remaining = tokens.get(next..).unwrap_or_default();
            bound.insert(spec.name.clone(), remaining.join(" "));
            next = tokens.len();
            continue;
        }
        let Some(token) = tokens.get(next) else {
            return Err(MissingArgumentError {
                name: spec.name.clone(),
            });
        };
        bound.insert(spec.name.clone(), token.clone());
        next += 1;
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn binds_positionally() {
        let specs = vec![ArgSpec::new("src"), ArgSpec::new("dst")];
        let bound = bind_args(&specs, &tokens(&["a.txt", "b.txt"])).expect("bind");
        assert_eq!(bound["src"], "a.txt");
        assert_eq!(bound["dst"], "b.txt");
    }

    #[test]
    fn missing_token_names_the_argument() {
        let specs = vec![ArgSpec::new("src"), ArgSpec::new("dst")];
        let err = bind_args(&specs, &tokens(&["a.txt"])).expect_err("missing");
        assert_eq!(err.name, "dst");
        assert_eq!(err.to_string(), "missing required argument: dst");
    }

    #[test]
    fn rest_joins_remaining_tokens() {
        let specs = vec![ArgSpec::new("target"), ArgSpec::rest("query")];
        let bound =
            bind_args(&specs, &tokens(&["prod", "find", "large", "files"])).expect("bind");
        assert_eq!(bound["target"], "prod");
        assert_eq!(bound["query"], "find large files");
    }

    #[test]
    fn rest_with_no_tokens_binds_empty_string() {
        let specs = vec![ArgSpec::new("target"), ArgSpec::rest("query")];
        let bound = bind_args(&specs, &tokens(&["prod"])).expect("bind");
        assert_eq!(bound["query"], "");

        let bound = bind_args(&[ArgSpec::rest("all")], &[]).expect("bind");
        assert_eq!(bound["all"], "");
    }

    #[test]
    fn extra_tokens_are_ignored_without_rest() {
        let specs = vec![ArgSpec::new("name")];
        let bound = bind_args(&specs, &tokens(&["World", "extra"])).expect("bind");
        assert_eq!(bound.len(), 1);
        assert_eq!(bound["name"], "World");
    }
}
