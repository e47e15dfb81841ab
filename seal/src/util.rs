//! Typo suggestions for unknown names

/// Levenshtein edit distance, computed over chars with a single rolling row.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        // row[j] before overwrite is the diagonal for j + 1
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }

    row[b.len()]
}

/// Closest candidate within `threshold` edits. Ties go to the earlier candidate.
pub fn find_similar_name<'a>(name: &str, candidates: &[&'a str], threshold: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (levenshtein_distance(name, candidate), candidate))
        .filter(|&(distance, _)| distance <= threshold)
        .min_by_key(|&(distance, _)| distance)
        .map(|(_, candidate)| candidate)
}

/// Suffix appended to "unknown name" messages
pub fn format_suggestion_hint(suggestion: Option<&str>) -> String {
    suggestion
        .map(|name| format!("\n  hint: did you mean `{name}`?"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("Mammal", "Mammal"), 0);
        assert_eq!(levenshtein_distance("Mamal", "Mammal"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("Cat", "cat"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("Dog", ""), 3);
        assert_eq!(levenshtein_distance("", "Dog"), 3);
    }

    #[test]
    fn test_find_similar_name() {
        let classes = ["Mammal", "Cat", "Human"];
        assert_eq!(find_similar_name("Mamal", &classes, 2), Some("Mammal"));
        assert_eq!(find_similar_name("Hunam", &classes, 2), Some("Human"));
        assert_eq!(find_similar_name("Zebra", &classes, 2), None);
    }

    #[test]
    fn test_find_similar_name_prefers_first_on_tie() {
        assert_eq!(find_similar_name("Bat", &["Cat", "Rat"], 1), Some("Cat"));
    }

    #[test]
    fn test_format_suggestion_hint() {
        assert_eq!(format_suggestion_hint(Some("String")), "\n  hint: did you mean `String`?");
        assert_eq!(format_suggestion_hint(None), "");
    }
}
