/// Split a model command line into argv, respecting single- and
/// double-quoted spans and backslash escapes, so a quoted argument
/// containing a space (e.g. a path) survives the split intact.
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if !in_single_quote => escape_next = true,
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ' ' | '\t' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(shell_split("/bin/sleep 30"), vec!["/bin/sleep", "30"]);
    }

    #[test]
    fn respects_double_quotes() {
        assert_eq!(
            shell_split(r#"run "in put" out"#),
            vec!["run", "in put", "out"]
        );
    }

    #[test]
    fn respects_single_quotes() {
        assert_eq!(
            shell_split("run 'a b' c"),
            vec!["run", "a b", "c"]
        );
    }

    #[test]
    fn empty_input_yields_no_args() {
        assert!(shell_split("").is_empty());
        assert!(shell_split("   ").is_empty());
    }
}
