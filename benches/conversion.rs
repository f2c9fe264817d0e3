//! Benchmarks for the MobiML conversion pipeline.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use mobiml::dom::parse_html;
use mobiml::mobi::FontLadder;
use mobiml::style::{Stylesheet, Stylizer};
use mobiml::{ConvertOptions, MobiMlizer, NoImages, OutputProfile};

const CSS: &str = r#"
body { margin: 0 5% }
h2 { font-size: 1.4em; text-align: center; page-break-before: always }
p { margin: 0; text-indent: 1.5em }
p.first { text-indent: 0 }
.verse { margin-left: 2em; font-style: italic }
.note { font-size: smaller; vertical-align: super }
td { padding: 2pt }
"#;

/// A synthetic chapter with headings, styled paragraphs, lists and a table.
fn sample_chapter(sections: usize) -> String {
    let mut html = String::from("<html><head><title>Sample</title></head><body>");
    for i in 0..sections {
        html.push_str(&format!("<h2 id=\"s{i}\">Section {i}</h2>"));
        html.push_str("<p class=\"first\">It was a <b>dark</b> and <i>stormy</i> night");
        html.push_str("<span class=\"note\"><a href=\"#n1\">1</a></span>.</p>");
        for _ in 0..8 {
            html.push_str("<p>The rain fell in torrents, except at occasional intervals, ");
            html.push_str("when it was checked by a <em>violent</em> gust of wind.</p>");
        }
        html.push_str("<p class=\"verse\">Line one<br/>Line two</p>");
        html.push_str("<ul><li>first</li><li>second <q>quoted</q></li></ul>");
        html.push_str("<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>");
    }
    html.push_str("</body></html>");
    html
}

// ============================================================================
// Pipeline stages
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let html = sample_chapter(20);
    c.bench_function("parse_html", |b| {
        b.iter(|| parse_html(black_box(&html)));
    });
}

fn bench_cascade(c: &mut Criterion) {
    let source = parse_html(&sample_chapter(20));
    let sheets = [Stylesheet::parse(CSS)];
    let profile = OutputProfile::default();
    c.bench_function("stylize", |b| {
        b.iter(|| Stylizer::new(black_box(&source), &sheets, &profile));
    });
}

fn bench_convert(c: &mut Criterion) {
    let source = parse_html(&sample_chapter(20));
    let sheets = [Stylesheet::parse(CSS)];
    let profile = OutputProfile::default();
    let styles = Stylizer::new(&source, &sheets, &profile);

    let mut group = c.benchmark_group("convert");
    group.bench_function("default", |b| {
        let mut converter = MobiMlizer::new(profile.clone(), ConvertOptions::default());
        b.iter(|| converter.convert_document(black_box(&source), &styles, &NoImages));
    });
    group.bench_function("flattened", |b| {
        let options = ConvertOptions {
            ignore_tables: true,
            ignore_margins: true,
        };
        let mut converter = MobiMlizer::new(profile.clone(), options);
        b.iter(|| converter.convert_document(black_box(&source), &styles, &NoImages));
    });
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let source = parse_html(&sample_chapter(20));
    let profile = OutputProfile::default();
    let styles = Stylizer::new(&source, &[Stylesheet::parse(CSS)], &profile);
    let document = MobiMlizer::new(profile, ConvertOptions::default())
        .convert_document(&source, &styles, &NoImages);
    c.bench_function("to_xml", |b| {
        b.iter(|| black_box(&document).to_xml());
    });
}

fn bench_font_ladder(c: &mut Criterion) {
    let profile = OutputProfile::default();
    let sizes: Vec<f64> = (1..400).map(|i| f64::from(i) * 0.25).collect();
    c.bench_function("font_ladder_uncached", |b| {
        let ladder = FontLadder::new(&profile);
        b.iter(|| sizes.iter().map(|&s| u32::from(ladder.nearest(black_box(s)))).sum::<u32>());
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_cascade,
    bench_convert,
    bench_serialize,
    bench_font_ladder
);
criterion_main!(benches);
