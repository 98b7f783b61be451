use crate::types::Author;

/// Renders the display label of a program: `"{org name} - {Program Name}"`,
/// with `@{github name}` standing in for unverified authors.
pub fn make_program_label(author: &Author, program_name: &str) -> String {
    let author_label = match &author.info {
        Some(info) => info.name.clone(),
        None => format!("@{}", author.name),
    };
    format!("{} - {}", author_label, start_case(program_name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Upper,
    Lower,
    Digit,
    Separator,
}

fn classify(ch: char) -> CharClass {
    if ch.is_uppercase() {
        CharClass::Upper
    } else if ch.is_numeric() {
        CharClass::Digit
    } else if ch.is_alphabetic() {
        CharClass::Lower
    } else {
        CharClass::Separator
    }
}

/// Splits an identifier into words on separators, camelCase humps and
/// letter/digit boundaries.
pub fn split_words(value: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev = CharClass::Separator;

    for ch in value.chars() {
        let class = classify(ch);
        if class == CharClass::Separator {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = class;
            continue;
        }

        let boundary = match (prev, class) {
            (CharClass::Separator, _) => false,
            (CharClass::Digit, CharClass::Digit) => false,
            (CharClass::Digit, _) | (_, CharClass::Digit) => true,
            (CharClass::Lower, CharClass::Upper) => true,
            _ => false,
        };
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }

        // "XMLParser": the last capital of an acronym starts the next word.
        if prev == CharClass::Upper && class == CharClass::Lower && current.chars().count() > 1 {
            if let Some(last) = current.pop() {
                words.push(std::mem::take(&mut current));
                current.push(last);
            }
        }

        current.push(ch);
        prev = class;
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

pub fn start_case(value: &str) -> String {
    split_words(value)
        .iter()
        .map(|word| upper_first(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use crate::label::{make_program_label, split_words, start_case};
    use crate::types::{Author, VerifiedOrganization};

    #[test]
    fn unverified_author_uses_github_name() {
        let author = Author {
            name: "acme".to_string(),
            info: None,
        };
        assert_eq!(make_program_label(&author, "tokenSwap"), "@acme - Token Swap");
    }

    #[test]
    fn verified_author_uses_display_name() {
        let author = Author {
            name: "acme".to_string(),
            info: Some(VerifiedOrganization {
                name: "Acme Corp".to_string(),
                github: "acme".to_string(),
                website: None,
            }),
        };
        assert_eq!(
            make_program_label(&author, "tokenSwap"),
            "Acme Corp - Token Swap"
        );
    }

    #[test]
    fn start_case_splits_mixed_identifiers() {
        assert_eq!(start_case("myProgram-v2"), "My Program V 2");
        assert_eq!(start_case("stable_swap"), "Stable Swap");
        assert_eq!(start_case("quarry-mine"), "Quarry Mine");
        assert_eq!(start_case("XMLParser"), "XML Parser");
        assert_eq!(start_case("spl2022token"), "Spl 2022 Token");
        assert_eq!(start_case("__lending__"), "Lending");
    }

    #[test]
    fn split_words_on_empty_input() {
        assert!(split_words("").is_empty());
        assert!(split_words("--").is_empty());
    }
}
