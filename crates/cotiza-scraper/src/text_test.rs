use super::*;

fn siman() -> Boilerplate {
    Boilerplate::new(&[r"Vendido por", r"Agregar al carrito", r"\$\d"])
}

// -----------------------------------------------------------------------
// clean_name
// -----------------------------------------------------------------------

#[test]
fn clean_name_drops_boilerplate_lines() {
    let raw = "Licuadora Oster\n  10 velocidades \nVendido por Simán\n$49.99\nAgregar al carrito";
    assert_eq!(clean_name(raw, &siman()), "Licuadora Oster 10 velocidades");
}

#[test]
fn clean_name_matches_case_insensitively() {
    let raw = "Plancha Black+Decker\nAGREGAR AL CARRITO";
    assert_eq!(clean_name(raw, &siman()), "Plancha Black+Decker");
}

#[test]
fn clean_name_never_contains_newlines() {
    let cleaned = clean_name("a\r\nb\n\nc", &siman());
    assert_eq!(cleaned, "a b c");
}

#[test]
fn clean_name_truncates_to_200_chars() {
    let raw = "ñ".repeat(250);
    let cleaned = clean_name(&raw, &siman());
    assert_eq!(cleaned.chars().count(), MAX_NAME_CHARS);
}

#[test]
fn clean_name_is_idempotent() {
    let long = "palabra ".repeat(60);
    let inputs = [
        "Licuadora Oster\nVendido por Simán\n$49.99",
        "  spaced   out \n\n name ",
        "Vendido\npor terceros",
        "$\n5 pack",
        "",
        long.as_str(),
    ];
    let bp = siman();
    for raw in inputs {
        let once = clean_name(raw, &bp);
        assert_eq!(clean_name(&once, &bp), once, "input: {raw:?}");
    }
}

#[test]
fn clean_name_is_idempotent_when_the_cut_forms_a_marker() {
    let prismamoda = Boilerplate::new(&["Agregar", r"\$\d", "Comprar", r"\bVer\b", "Añadir"]);
    // Cutting at 200 chars leaves "... Ver" out of "Verde".
    let raw = format!("{} Verde", "a".repeat(196));
    let once = clean_name(&raw, &prismamoda);
    assert_eq!(once, "");
    assert_eq!(clean_name(&once, &prismamoda), once);

    let fits = format!("{} Verde", "a".repeat(150));
    let once = clean_name(&fits, &prismamoda);
    assert_eq!(once, fits);
    assert_eq!(clean_name(&once, &prismamoda), once);
}

#[test]
fn clean_name_rejects_marker_split_across_lines() {
    assert_eq!(clean_name("Vendido\npor terceros", &siman()), "");
}

#[test]
fn truncate_chars_respects_char_boundaries() {
    assert_eq!(truncate_chars("Simán", 4), "Simá");
    assert_eq!(truncate_chars("abc", 10), "abc");
    assert_eq!(truncate_chars("ab cd", 3), "ab");
}

// -----------------------------------------------------------------------
// normalize_key
// -----------------------------------------------------------------------

#[test]
fn normalize_key_folds_case_and_punctuation() {
    assert_eq!(
        normalize_key("Arroz Excelencia 1lb"),
        normalize_key("arroz excelencia 1lb!!")
    );
    assert_eq!(normalize_key("  Arroz   Excelencia, 1lb "), "arroz excelencia 1lb");
}

#[test]
fn normalize_key_keeps_accented_letters() {
    assert_eq!(normalize_key("Café Listo (200g)"), "café listo 200g");
}

#[test]
fn first_substantial_line_skips_short_lines() {
    assert_eq!(
        first_substantial_line("Nuevo\n  Camisa Oxford  \nS/M", 5),
        Some("Camisa Oxford")
    );
    assert_eq!(first_substantial_line("a\nb", 5), None);
}
