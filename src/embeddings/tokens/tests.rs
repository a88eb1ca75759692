use super::*;

#[test]
fn empty_text_has_no_tokens() {
    assert_eq!(estimate_token_count(""), 0);
    assert_eq!(estimate_token_count("   \n\t"), 0);
}

#[test]
fn words_dominate_the_estimate() {
    // 3 words / 0.75 = 4
    assert_eq!(estimate_token_count("list all products"), 4);
}

#[test]
fn punctuation_adds_tokens() {
    let plain = estimate_token_count("a b c d e f g h i j");
    let punctuated = estimate_token_count("a, b, c, d, e, f, g, h, i, j.");
    assert_eq!(plain, 13);
    assert_eq!(punctuated, 14);
}

#[test]
fn slovak_text_is_counted_by_words() {
    let estimate = estimate_token_count("Vráti zoznam všetkých produktov v obchode");
    assert_eq!(estimate, 8);
}
