/// Replace `${ENV_VAR}` placeholders in config text.
///
/// Unknown variables and malformed placeholders are emitted unchanged, so a
/// config referencing an unset secret fails loudly at the point of use
/// instead of silently becoming an empty string.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            _ => {
                // No closing brace (or empty name): keep the literal text.
                out.push_str("${");
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}
