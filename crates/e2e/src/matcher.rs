//! Substring containment checks over captured command output

/// Substrings from `substrs` that do not appear in `text`, in input order.
pub fn missing_substrings<'a, S: AsRef<str>>(substrs: &'a [S], text: &str) -> Vec<&'a str> {
    substrs
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !text.contains(s))
        .collect()
}

/// Check that every substring appears in `text`.
///
/// On failure the message has the form
///
/// ```text
/// did not output the expected substring(s): <s1>, <s2>, ...
/// and instead output: <text>
/// ```
pub fn check_contains_all<S: AsRef<str>>(substrs: &[S], text: &str) -> Result<(), String> {
    let missing = missing_substrings(substrs, text);
    if missing.is_empty() {
        return Ok(());
    }
    Err(format!(
        "did not output the expected substring(s): {}\nand instead output: {}",
        missing.join(", "),
        text
    ))
}

/// Check that none of the substrings appear in `text`, reporting the first hit.
pub fn check_contains_none<S: AsRef<str>>(substrs: &[S], text: &str) -> Result<(), String> {
    match substrs.iter().map(AsRef::as_ref).find(|s| text.contains(s)) {
        Some(found) => Err(format!("included the undesired output {:?}:\n{}", found, text)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&["hello", "world"], "hello world", true ; "all present")]
    #[test_case(&["hello", "goodbye"], "hello world", false ; "one missing")]
    #[test_case(&[], "anything", true ; "empty set is satisfied")]
    #[test_case(&[""], "", true ; "empty substring is always present")]
    fn contains_all(substrs: &[&str], text: &str, ok: bool) {
        assert_eq!(check_contains_all(substrs, text).is_ok(), ok);
    }

    #[test]
    fn reports_every_missing_substring() {
        let err = check_contains_all(&["a", "goodbye", "moon"], "a world").unwrap_err();
        assert_eq!(
            err,
            "did not output the expected substring(s): goodbye, moon\nand instead output: a world"
        );
    }

    #[test]
    fn reports_first_forbidden_substring() {
        let err = check_contains_none(&["x", "error", "world"], "hello world error").unwrap_err();
        assert_eq!(err, "included the undesired output \"error\":\nhello world error");
    }

    #[test]
    fn contains_none_passes_when_absent() {
        assert!(check_contains_none(&["Terminating"], "pod/web Running").is_ok());
    }

    #[test]
    fn checks_are_idempotent() {
        let substrs = ["ready", "synced"];
        let text = "ready=true";
        assert_eq!(
            check_contains_all(&substrs, text),
            check_contains_all(&substrs, text)
        );
        assert_eq!(
            check_contains_none(&substrs, text),
            check_contains_none(&substrs, text)
        );
    }
}
