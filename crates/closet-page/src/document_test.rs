use super::*;

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("test selector")
}

const PAGE: &str = r#"<html><body>
<div id="main"><h1 id="title">Wool Coat</h1><img id="hero" src="/a.jpg"></div>
<ul id="thumbs"><li class="t">1</li><li class="t">2</li></ul>
</body></html>"#;

#[test]
fn insert_after_places_node_as_next_sibling() {
    let mut doc = HostDocument::parse(PAGE);
    let title = doc.select_first(&sel("#title")).expect("title").id();

    let inserted = doc
        .insert_html_after(title, r#"<div id="added">x</div>"#)
        .expect("inserted");

    let next = doc
        .element(title)
        .and_then(|el| el.next_siblings().find_map(ElementRef::wrap))
        .expect("next sibling");
    assert_eq!(next.id(), inserted);
    assert_eq!(next.value().attr("id"), Some("added"));
}

#[test]
fn prepend_and_append_respect_order() {
    let mut doc = HostDocument::parse(PAGE);
    let list = doc.select_first(&sel("#thumbs")).expect("list").id();

    doc.prepend_html(list, r#"<li class="t" id="first">0</li>"#);
    doc.append_html(list, r#"<li class="t" id="last">3</li>"#);

    let ids: Vec<String> = doc
        .select_all(&sel("#thumbs > li"))
        .iter()
        .map(|el| el.text().collect::<String>())
        .collect();
    assert_eq!(ids, ["0", "1", "2", "3"]);
}

#[test]
fn multi_node_fragment_keeps_source_order() {
    let mut doc = HostDocument::parse(PAGE);
    let list = doc.select_first(&sel("#thumbs")).expect("list").id();

    doc.prepend_html(list, r#"<li class="t">a</li><li class="t">b</li>"#);

    let texts: Vec<String> = doc
        .select_all(&sel("#thumbs > li"))
        .iter()
        .map(|el| el.text().collect::<String>())
        .collect();
    assert_eq!(texts, ["a", "b", "1", "2"]);
}

#[test]
fn removed_subtrees_no_longer_match_selectors() {
    let mut doc = HostDocument::parse(PAGE);
    let main = doc.select_first(&sel("#main")).expect("main").id();

    assert!(doc.remove(main));

    assert!(!doc.exists(&sel("#title")));
    assert!(!doc.exists(&sel("#hero")));
    assert!(!doc.is_attached(main));
    assert!(!doc.remove(main), "detached nodes cannot be removed twice");
}

#[test]
fn remove_all_counts_matches() {
    let mut doc = HostDocument::parse(PAGE);
    assert_eq!(doc.remove_all(&sel("li.t")), 2);
    assert_eq!(doc.count(&sel("li.t")), 0);
}

#[test]
fn records_capture_added_and_removed_nodes() {
    let mut doc = HostDocument::parse(PAGE);
    let body = doc.body().expect("body").id();
    let main = doc.select_first(&sel("#main")).expect("main").id();

    let added = doc.append_html(body, "<p>hi</p>").expect("added");
    doc.remove(main);

    let records = doc.take_records();
    assert_eq!(
        records,
        vec![
            MutationRecord {
                kind: MutationKind::ChildAdded,
                target: body,
                node: added,
            },
            MutationRecord {
                kind: MutationKind::ChildRemoved,
                target: body,
                node: main,
            },
        ]
    );
    assert!(doc.take_records().is_empty());
}

#[test]
fn set_attr_updates_existing_attribute_only() {
    let mut doc = HostDocument::parse(PAGE);
    let hero = doc.select_first(&sel("#hero")).expect("hero").id();

    assert!(doc.set_attr(hero, "src", "https://cdn.example/tryon.png"));
    assert!(!doc.set_attr(hero, "alt", "missing"));

    let hero = doc.element(hero).expect("hero");
    assert_eq!(hero.value().attr("src"), Some("https://cdn.example/tryon.png"));
    assert_eq!(hero.value().attr("alt"), None);
}

#[test]
fn contains_walks_ancestors() {
    let doc = HostDocument::parse(PAGE);
    let main = doc.select_first(&sel("#main")).expect("main").id();
    let title = doc.select_first(&sel("#title")).expect("title").id();
    let thumbs = doc.select_first(&sel("#thumbs")).expect("thumbs").id();

    assert!(doc.contains(main, title));
    assert!(doc.contains(main, main));
    assert!(!doc.contains(main, thumbs));
}

#[test]
fn replace_swaps_node_in_place() {
    let mut doc = HostDocument::parse(PAGE);
    let title = doc.select_first(&sel("#title")).expect("title").id();

    doc.replace_html(title, r#"<h2 id="subtitle">Coat</h2>"#)
        .expect("replaced");

    assert!(!doc.exists(&sel("#title")));
    let first = doc
        .select_first(&sel("#main > *"))
        .expect("first child");
    assert_eq!(first.value().attr("id"), Some("subtitle"));
}
