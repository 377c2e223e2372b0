/// Substitute `:token` placeholders in `line`.
///
/// `:name` takes the value as given, `:NAME` the value upper-cased and
/// `:Name` the value with its first letter upper-cased. Longer tokens are
/// replaced first so `:name` never clobbers `:names`.
pub fn make_replacements(line: &str, replacements: &[(&str, &str)]) -> String {
    if replacements.is_empty() {
        return line.to_string();
    }

    let mut ordered = replacements.to_vec();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut line = line.to_string();
    for (key, value) in ordered {
        line = line
            .replace(&format!(":{}", key), value)
            .replace(&format!(":{}", key.to_uppercase()), &value.to_uppercase())
            .replace(&format!(":{}", capitalize(key)), &capitalize(value));
    }
    line
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
