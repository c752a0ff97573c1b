//! English singularization for table identifiers
//!
//! Primary keys are named after the singular form of their table
//! (`AUTHORS` → `AUTHOR_ID`). Identifiers are usually upper case, so the
//! rules work on lower case and restore the input's case afterwards.
//!
//! Suffix rules are regular expressions tried from the most specific to
//! the most general; the first one that matches rewrites the word.

use regex::Regex;
use std::sync::OnceLock;

const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("teeth", "tooth"),
    ("feet", "foot"),
    ("oxen", "ox"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("vertices", "vertex"),
    ("criteria", "criterion"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "information",
    "media",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
    "staff",
];

/// (pattern, replacement), most specific first
const SUFFIX_RULES: &[(&str, &str)] = &[
    (r"(matr|append)ices$", "${1}ix"),
    (r"(cod|mur|sil|vert|ind)ices$", "${1}ex"),
    (r"(alumn|alg|vertebr)ae$", "${1}a"),
    (
        r"(apheli|hyperbat|periheli|asyndet|noumen|phenomen|criteri|organ|prolegomen|hedr|automat)a$",
        "${1}on",
    ),
    (
        r"(alumn|syllab|vir|radi|nucle|fung|cact|stimul|termin|bacill|foc|uter|loc|strat)(?:us|i)$",
        "${1}us",
    ),
    (r"(test)(?:is|es)$", "${1}is"),
    (r"(movie|twelve|abuse|e[mn]u)s$", "${1}"),
    (
        r"(analy|diagno|parenthe|progno|synop|the|empha|cri|ne)(?:sis|ses)$",
        "${1}sis",
    ),
    (
        r"(x|ch|ss|sh|zz|tto|go|cho|alias|[^aou]us|t[lm]as|gas|(?:her|at|gr)o|[aeiou]ris)(?:es)?$",
        "${1}",
    ),
    (r"\b((?:tit)?m|l)ice$", "${1}ouse"),
    (r"\b(mon|smil)ies$", "${1}ey"),
    (
        r"\b(l|(?:neck|cross|hog|aun)?t|coll|faer|food|gen|goon|group|hipp|junk|vegg|(?:pork)?p|charl|calor|cut)ies$",
        "${1}ie",
    ),
    (
        r"(dg|ss|ois|lk|ok|wn|mb|th|ch|ec|oal|is|ck|ix|sser|ts|wb)ies$",
        "${1}ie",
    ),
    (r"ies$", "y"),
    (r"(ar|(?:wo|[ae])l|[eo][ao])ves$", "${1}f"),
    (
        r"(wi|kni|(?:after|half|high|low|mid|non|night|[^\w]|^)li)ves$",
        "${1}fe",
    ),
    (r"(ss)$", "${1}"),
    (r"s$", ""),
];

fn suffix_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        SUFFIX_RULES
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|regex| (regex, *replacement))
            })
            .collect()
    })
}

/// Singular form of `word`, keeping its letter case
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    let singular = singularize_lower(&lower);
    if singular == lower {
        return word.to_string();
    }
    restore_case(word, &singular)
}

fn singularize_lower(word: &str) -> String {
    // Only the last `_`-separated part of a compound identifier is inflected.
    if let Some((head, tail)) = word.rsplit_once('_') {
        if !tail.is_empty() {
            return format!("{}_{}", head, singularize_lower(tail));
        }
    }

    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some(singular) = irregular_singular(word) {
        return singular.to_string();
    }
    let stripped = apply_suffix_rules(word);
    irregular_singular(&stripped)
        .map(str::to_string)
        .unwrap_or(stripped)
}

fn irregular_singular(word: &str) -> Option<&'static str> {
    IRREGULAR
        .iter()
        .find(|(plural, _)| *plural == word)
        .map(|(_, singular)| *singular)
}

fn apply_suffix_rules(word: &str) -> String {
    for (regex, replacement) in suffix_rules() {
        if regex.is_match(word) {
            let singular = regex.replace(word, *replacement);
            if singular.is_empty() {
                break;
            }
            return singular.into_owned();
        }
    }
    word.to_string()
}

fn restore_case(original: &str, singular: &str) -> String {
    let has_lower = original.chars().any(char::is_lowercase);
    let has_upper = original.chars().any(char::is_uppercase);
    if has_upper && !has_lower {
        return singular.to_uppercase();
    }
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = singular.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    singular.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(suffix_rules().len(), SUFFIX_RULES.len());
    }

    #[test]
    fn test_regular_plurals() {
        assert_eq!(singularize("AUTHORS"), "AUTHOR");
        assert_eq!(singularize("books"), "book");
        assert_eq!(singularize("Orders"), "Order");
    }

    #[test]
    fn test_suffix_rules() {
        assert_eq!(singularize("CITIES"), "CITY");
        assert_eq!(singularize("BOXES"), "BOX");
        assert_eq!(singularize("BRANCHES"), "BRANCH");
        assert_eq!(singularize("ADDRESSES"), "ADDRESS");
        assert_eq!(singularize("HEROES"), "HERO");
        assert_eq!(singularize("KNIVES"), "KNIFE");
        assert_eq!(singularize("WOLVES"), "WOLF");
    }

    #[test]
    fn test_us_oe_and_ie_plurals() {
        assert_eq!(singularize("STATUSES"), "STATUS");
        assert_eq!(singularize("BUSES"), "BUS");
        assert_eq!(singularize("SHOES"), "SHOE");
        assert_eq!(singularize("MOVIES"), "MOVIE");
        assert_eq!(singularize("COOKIES"), "COOKIE");
        assert_eq!(singularize("Campuses"), "Campus");
    }

    #[test]
    fn test_words_left_alone() {
        assert_eq!(singularize("AUTHOR"), "AUTHOR");
        assert_eq!(singularize("ADDRESS"), "ADDRESS");
        assert_eq!(singularize("STATUS"), "STATUS");
        assert_eq!(singularize("BUS"), "BUS");
        assert_eq!(singularize("ANALYSIS"), "ANALYSIS");
        assert_eq!(singularize("NEWS"), "NEWS");
        assert_eq!(singularize("S"), "S");
        assert_eq!(singularize(""), "");
    }

    #[test]
    fn test_irregular_and_compound() {
        assert_eq!(singularize("PEOPLE"), "PERSON");
        assert_eq!(singularize("MENS"), "MAN");
        assert_eq!(singularize("ORDER_ITEMS"), "ORDER_ITEM");
        assert_eq!(singularize("SALES_CATEGORIES"), "SALES_CATEGORY");
        assert_eq!(singularize("ORDER_STATUSES"), "ORDER_STATUS");
    }

    proptest! {
        #[test]
        fn singularize_is_idempotent(word in "[A-Z]{2,12}") {
            let once = singularize(&word);
            prop_assert_eq!(singularize(&once), once);
        }

        #[test]
        fn case_is_preserved(word in "[a-z]{2,12}") {
            let upper = singularize(&word.to_uppercase());
            prop_assert_eq!(upper, singularize(&word).to_uppercase());
        }
    }
}
