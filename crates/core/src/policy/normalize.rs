//! Word normalization used by the restructure policy.

/// Converts a path segment to lower camel case.
///
/// Every maximal run of characters that are not ASCII letters or digits acts
/// as a single word break. The first word is lowercased, every following word
/// is capitalized, and the words are joined without separators. Only ASCII is
/// inspected, so the result does not depend on the locale.
///
/// ```
/// use mp3cator_core::policy::to_camel_case;
///
/// assert_eq!(to_camel_case("01 - My Awesome Song"), "01MyAwesomeSong");
/// assert_eq!(to_camel_case("hello world"), "helloWorld");
/// assert_eq!(to_camel_case(" -- "), "");
/// ```
pub fn to_camel_case(text: &str) -> String {
    let mut words = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty());

    let Some(first) = words.next() else {
        return String::new();
    };

    let mut out = first.to_ascii_lowercase();
    for word in words {
        out.push_str(&capitalize(word));
    }
    out
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(word.len());
            out.push(first.to_ascii_uppercase());
            out.push_str(&chars.as_str().to_ascii_lowercase());
            out
        }
        None => String::new(),
    }
}
