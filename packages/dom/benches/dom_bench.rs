use criterion::{black_box, criterion_group, criterion_main, Criterion};
use livepage_dom::{parse, StyleResolver};

fn landing_page() -> String {
    let mut page = String::from(
        "<!DOCTYPE html><html><head><style>.card { background-image: url(card.png) } \
         #hero { background: url(hero.jpg) center / cover }</style></head><body>",
    );
    page.push_str("<header id=\"hero\"><h1>Welcome</h1><p>Tagline &amp; more</p></header>");
    for i in 0..50 {
        page.push_str(&format!(
            "<div class=\"card\"><h2>Card {i}</h2><p>Body text for card {i}.</p>\
             <img src=\"img/{i}.png\" alt=\"card {i}\"><a href=\"/c/{i}\">More</a></div>"
        ));
    }
    page.push_str("</body></html>");
    page
}

fn parse_landing_page(c: &mut Criterion) {
    let source = landing_page();
    c.bench_function("parse_landing_page", |b| b.iter(|| parse(black_box(&source))));
}

fn serialize_landing_page(c: &mut Criterion) {
    let doc = parse(&landing_page());
    c.bench_function("serialize_landing_page", |b| b.iter(|| black_box(&doc).to_html()));
}

fn resolve_backgrounds(c: &mut Criterion) {
    let doc = parse(&landing_page());
    c.bench_function("resolve_backgrounds", |b| {
        b.iter(|| {
            let resolver = StyleResolver::new(&doc);
            doc.all_elements()
                .into_iter()
                .filter(|n| resolver.background_image(&doc, *n).is_some())
                .count()
        })
    });
}

criterion_group!(
    benches,
    parse_landing_page,
    serialize_landing_page,
    resolve_backgrounds
);
criterion_main!(benches);
