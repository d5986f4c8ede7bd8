/// Converts a field identifier to the lower snake case used for stored names.
///
/// The first character is lower-cased; every later upper-case character is
/// prefixed with `_` and lower-cased. Identifiers that are already snake case
/// pass through unchanged.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
