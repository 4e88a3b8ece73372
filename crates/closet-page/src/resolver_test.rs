use closet_core::default_sites;
use closet_core::sites::parse_sites;

use super::*;
use crate::error::PageError;

fn registry() -> PatternRegistry {
    PatternRegistry::compile(&default_sites().expect("embedded sites")).expect("compiles")
}

#[test]
fn resolves_site_by_host_fragment() {
    let registry = registry();
    let resolution = registry
        .resolve("www.amazon.com", "https://www.amazon.com/dp/B0TEST")
        .expect("amazon product page");
    assert_eq!(resolution.site_id, "amazon");
    assert_eq!(resolution.variant, "com");
}

#[test]
fn unknown_host_without_fallback_is_not_actionable() {
    let registry = registry();
    assert!(registry
        .resolve("www.example.com", "https://www.example.com/dp/B0TEST")
        .is_none());
}

#[test]
fn url_rejected_by_every_variant_is_not_actionable() {
    let registry = registry();
    assert!(registry
        .resolve("www.amazon.com", "https://www.amazon.com/gp/cart/view.html")
        .is_none());
}

#[test]
fn region_variant_is_preferred_when_it_accepts_url() {
    let registry = registry();
    let resolution = registry
        .resolve("www.walmart.ca", "https://www.walmart.ca/en/ip/jacket/123")
        .expect("walmart.ca product page");
    assert_eq!(resolution.site_id, "walmart");
    assert_eq!(resolution.variant, "ca");
}

#[test]
fn missing_region_variant_falls_back_to_default() {
    let registry = registry();
    let resolution = registry
        .resolve("www.amazon.ca", "https://www.amazon.ca/dp/B0TEST")
        .expect("falls back to com");
    assert_eq!(resolution.variant, "com");
}

#[test]
fn rejected_region_variant_falls_back_to_default() {
    let sites = parse_sites(
        r#"
sites:
  - id: shop
    hosts: ["shop"]
    variants:
      com:
        url_pattern: '/product/'
        selectors: { title: h1, image: img, price: .p, insert_target: h1 }
      ca:
        url_pattern: '/produit/'
        selectors: { title: h2, image: img, price: .p, insert_target: h2 }
"#,
    )
    .expect("valid sites");
    let registry = PatternRegistry::compile(&sites).expect("compiles");

    let resolution = registry
        .resolve("shop.ca", "https://shop.ca/product/1")
        .expect("default variant accepts");
    assert_eq!(resolution.variant, "com");

    let resolution = registry
        .resolve("shop.ca", "https://shop.ca/produit/1")
        .expect("region variant accepts");
    assert_eq!(resolution.variant, "ca");
}

#[test]
fn first_matching_site_wins_in_file_order() {
    let sites = parse_sites(
        r#"
sites:
  - id: first
    hosts: ["store"]
    variants:
      com:
        url_pattern: '.*'
        selectors: { title: h1, image: img, price: .p, insert_target: h1 }
  - id: second
    hosts: ["bigstore"]
    variants:
      com:
        url_pattern: '.*'
        selectors: { title: h1, image: img, price: .p, insert_target: h1 }
"#,
    )
    .expect("valid sites");
    let registry = PatternRegistry::compile(&sites).expect("compiles");

    let resolution = registry
        .resolve("www.bigstore.com", "https://www.bigstore.com/p/1")
        .expect("resolves");
    assert_eq!(resolution.site_id, "first");
}

#[test]
fn fallback_site_handles_unknown_hosts() {
    let sites = parse_sites(
        r#"
fallback_site: generic
sites:
  - id: generic
    variants:
      com:
        url_pattern: '/products?/'
        selectors: { title: h1, image: img, price: .price, insert_target: h1 }
"#,
    )
    .expect("valid sites");
    let registry = PatternRegistry::compile(&sites).expect("compiles");

    let resolution = registry
        .resolve("boutique.fr", "https://boutique.fr/products/robe")
        .expect("fallback applies");
    assert_eq!(resolution.site_id, "generic");
    assert!(registry.resolve("boutique.fr", "https://boutique.fr/").is_none());
}

#[test]
fn compile_reports_bad_selector() {
    let sites = parse_sites(
        r#"
sites:
  - id: broken
    hosts: ["broken"]
    variants:
      com:
        url_pattern: '/p/'
        selectors: { title: "h1[", image: img, price: .p, insert_target: h1 }
"#,
    )
    .expect("yaml is valid even if the selector is not");
    let err = PatternRegistry::compile(&sites).expect_err("selector must fail");
    assert!(matches!(err, PageError::InvalidSelector { ref site, .. } if site == "broken"));
}

#[test]
fn compile_reports_bad_url_pattern() {
    let sites = parse_sites(
        r#"
sites:
  - id: broken
    hosts: ["broken"]
    variants:
      com:
        url_pattern: '(unclosed'
        selectors: { title: h1, image: img, price: .p, insert_target: h1 }
"#,
    )
    .expect("yaml is valid even if the pattern is not");
    let err = PatternRegistry::compile(&sites).expect_err("pattern must fail");
    assert!(matches!(err, PageError::InvalidUrlPattern { .. }));
}

#[test]
fn hostname_match_is_case_insensitive() {
    let registry = registry();
    assert!(registry
        .resolve("WWW.ETSY.COM", "https://www.etsy.com/listing/123/scarf")
        .is_some());
}

#[test]
fn compile_rejects_template_without_root_element() {
    let mut sites = default_sites().expect("embedded sites");
    let amazon = sites
        .sites
        .iter_mut()
        .find(|s| s.id == "amazon")
        .expect("amazon site");
    let variant = amazon.variants.get_mut("com").expect("com variant");
    variant.inject_template =
        Some(r#"<!-- closet --><li class="imageThumbnail"><img src="{{imageUrl}}"></li>"#.into());

    let err = PatternRegistry::compile(&sites).expect_err("template must fail");
    assert!(matches!(
        err,
        PageError::InvalidTemplate { ref site, ref variant } if site == "amazon" && variant == "com"
    ));
}
