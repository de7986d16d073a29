//! German-friendly ordering for display labels
//!
//! Dictionary order (DIN 5007-1): umlauts sort with their base letter, `ß` as
//! `ss`, accents and then case only break ties. On a case tie lower case comes
//! first, as in CLDR's German collation.

use std::cmp::Ordering;

fn fold_char(c: char, out: &mut String) {
    let folded = match c {
        'ä' | 'à' | 'á' | 'â' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ö' | 'ò' | 'ó' | 'ô' | 'õ' | 'ø' | 'ō' | 'ő' => "o",
        'ü' | 'ù' | 'ú' | 'û' | 'ū' | 'ů' | 'ű' => "u",
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ç' | 'ć' | 'č' => "c",
        'ñ' | 'ń' | 'ň' => "n",
        'š' | 'ś' | 'ş' | 'ș' => "s",
        'ž' | 'ź' | 'ż' => "z",
        'ý' | 'ÿ' => "y",
        'ł' => "l",
        'ř' => "r",
        'ď' => "d",
        'ť' | 'ţ' | 'ț' => "t",
        'ğ' => "g",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        _ => {
            out.push(c);
            return;
        }
    };
    out.push_str(folded);
}

/// Primary sort key: lower-case, diacritics folded to base letters
pub fn collation_key(s: &str) -> String {
    let mut key = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        fold_char(c, &mut key);
    }
    key
}

/// Swap the case of every letter, so that a plain comparison puts lower case
/// before upper case
fn case_inverted(s: &str) -> String {
    s.chars()
        .flat_map(|c| {
            let swapped: Vec<char> = if c.is_uppercase() {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            swapped
        })
        .collect()
}

/// Total order: folded key, then lower-case form (accents), then case with
/// lower case first, then the raw string
pub fn compare(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| case_inverted(a).cmp(&case_inverted(b)))
        .then_with(|| a.cmp(b))
}

pub fn sort(labels: &mut [String]) {
    labels.sort_by(|a, b| compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(input: &[&str]) -> Vec<String> {
        let mut labels: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        sort(&mut labels);
        labels
    }

    #[test]
    fn test_umlauts_sort_with_base_letter() {
        assert_eq!(
            sorted(&["Zucker", "Äpfel", "Apfelmus", "Butter"]),
            vec!["Äpfel", "Apfelmus", "Butter", "Zucker"]
        );
        assert_eq!(sorted(&["Öl", "Oliven", "Obst"]), vec!["Obst", "Öl", "Oliven"]);
    }

    #[test]
    fn test_case_is_secondary() {
        assert_eq!(sorted(&["Senf", "Sellerie", "senf"]), vec!["Sellerie", "senf", "Senf"]);
        assert_eq!(sorted(&["Öl", "öl", "Ol"]), vec!["Ol", "öl", "Öl"]);
    }

    #[test]
    fn test_latin_extended_sorts_with_base_letter() {
        assert_eq!(collation_key("Šopska Čorba"), "sopska corba");
        assert_eq!(collation_key("Łosoś"), "losos");
        assert_eq!(
            sorted(&["Tomaten", "Šopska", "Salat", "Zwiebel"]),
            vec!["Salat", "Šopska", "Tomaten", "Zwiebel"]
        );
        assert_eq!(sorted(&["Mango", "Łosoś", "Lauch"]), vec!["Lauch", "Łosoś", "Mango"]);
    }

    #[test]
    fn test_eszett() {
        assert_eq!(collation_key("Süßholz"), "sussholz");
        assert_eq!(sorted(&["Suppe", "Süßholz"]), vec!["Suppe", "Süßholz"]);
    }
}
