use super::*;
use serde_json::json;

fn base() -> Url {
    Url::parse("https://www.vidri.com.sv").unwrap()
}

// ---------------------------------------------------------------------------
// refine_block
// ---------------------------------------------------------------------------

#[test]
fn refine_block_separates_labels_from_title() {
    let raw = "TRUPER\nMartillo de uña 16 oz mango de fibra\nModelo # 19995\nQueda(n) 7\nAntes: $12.95\n$9.95\nAGREGAR";
    let block = refine_block(raw);
    assert_eq!(block.title.as_deref(), Some("Martillo de uña 16 oz mango de fibra"));
    assert_eq!(block.brand.as_deref(), Some("TRUPER"));
    assert_eq!(block.model.as_deref(), Some("19995"));
    assert_eq!(block.stock.as_deref(), Some("7"));
}

#[test]
fn refine_block_prefers_last_of_several_lines() {
    let block = refine_block("Herramientas\n120\nPintura látex blanco galón\nVálido hasta 30/11");
    assert_eq!(block.title.as_deref(), Some("Pintura látex blanco galón"));
    assert_eq!(block.brand, None);
}

#[test]
fn refine_block_drops_lines_containing_the_model() {
    let block = refine_block("Taladro percutor 1/2\nCódigo TP-550\nModelo # TP-550");
    assert_eq!(block.model.as_deref(), Some("TP-550"));
    assert_eq!(block.title.as_deref(), Some("Taladro percutor 1/2"));
}

#[test]
fn refine_block_ignores_empty_model_marker() {
    let block = refine_block("Cinta métrica 5m\nModelo #");
    assert_eq!(block.model, None);
    assert_eq!(block.title.as_deref(), Some("Cinta métrica 5m"));
}

#[test]
fn refine_block_without_text_has_no_title() {
    assert_eq!(refine_block(""), TitleBlock::default());
    assert_eq!(refine_block("$5.00\nAGREGAR").title, None);
}

// ---------------------------------------------------------------------------
// is_plausible_product
// ---------------------------------------------------------------------------

#[test]
fn plausible_when_priced_titled_or_product_link() {
    assert!(is_plausible_product("/x", "Otra cosa", true, "martillo", false));
    assert!(is_plausible_product("/x", "Martillo Truper", false, "martillo", false));
    assert!(is_plausible_product("/martillo-truper/p", "Otra cosa", false, "zzz", false));
    assert!(is_plausible_product("/producto/123", "Otra cosa", false, "zzz", false));
    assert!(!is_plausible_product("/ayuda", "Otra cosa", false, "zzz", false));
}

#[test]
fn category_links_need_opt_in() {
    assert!(!is_plausible_product("/catalogo/herramientas", "Herramientas", false, "zzz", false));
    assert!(is_plausible_product("/catalogo/herramientas", "Herramientas", false, "zzz", true));
    assert!(is_plausible_product("/promocion/noviembre", "Ofertas", false, "zzz", true));
}

// ---------------------------------------------------------------------------
// products_from_api
// ---------------------------------------------------------------------------

#[test]
fn api_products_map_name_link_price_and_image() {
    let body = json!([
        {
            "productName": "Martillo Truper 16oz",
            "linkText": "martillo-truper-16oz",
            "items": [{
                "images": [{ "imageUrl": "https://vidri.vteximg.com/m.jpg" }],
                "sellers": [{ "commertialOffer": { "Price": 9.95, "ListPrice": 12.95 } }]
            }]
        },
        {
            "productTitle": "Cinta aislante 3M",
            "linkText": "cinta-aislante-3m",
            "items": [{ "sellers": [{ "commertialOffer": { "Price": 1.5, "ListPrice": 1.5 } }] }]
        }
    ]);

    let products = products_from_api(body, &base());
    assert_eq!(products.len(), 2);

    let hammer = &products[0];
    assert_eq!(hammer.store, "Vidrí");
    assert_eq!(hammer.name, "Martillo Truper 16oz");
    assert_eq!(hammer.url, "https://www.vidri.com.sv/martillo-truper-16oz/p");
    assert_eq!(hammer.price_original, "$12.95");
    assert_eq!(hammer.price_discount, "$9.95");
    assert_eq!(hammer.image, "https://vidri.vteximg.com/m.jpg");

    let tape = &products[1];
    assert_eq!(tape.name, "Cinta aislante 3M");
    assert_eq!(tape.price_original, "$1.5");
    assert_eq!(tape.price_discount, "");
    assert_eq!(tape.image, "");
}

#[test]
fn api_products_without_name_or_price_are_handled() {
    let body = json!([
        { "linkText": "sin-nombre" },
        { "productName": "Brocha 2\"", "items": [{ "sellers": [{ "commertialOffer": { "Price": 0 } }] }] }
    ]);
    let products = products_from_api(body, &base());
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Brocha 2\"");
    assert_eq!(products[0].url, "https://www.vidri.com.sv/");
    assert!(!products[0].has_price());
}

#[test]
fn non_array_api_response_yields_nothing() {
    assert!(products_from_api(json!({ "error": "busy" }), &base()).is_empty());
    assert!(products_from_api(json!([]), &base()).is_empty());
}
