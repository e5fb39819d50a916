use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use juscrape_core::locate::locate_value;
use juscrape_core::text::{Replace, html_to_text, strip_script_tags};
use juscrape_core::{CancelToken, Document, ProjudiTjba, ScrapeConfig, ScriptedPage, try_fetch_case_info};

const PROJUDI_URL: &str = "https://projudi.tjba.jus.br/projudi/listagens/DadosProcesso?numeroProcesso=0000001";

fn bench_parse(c: &mut Criterion) {
    let projudi = std::fs::read_to_string("../../tests/fixtures/projudi/case.html").unwrap();
    let pje_tjba = std::fs::read_to_string("../../tests/fixtures/pje_tjba/case.html").unwrap();
    let pje_trt5 = std::fs::read_to_string("../../tests/fixtures/pje_trt5/timeline.html").unwrap();

    let mut group = c.benchmark_group("parse");

    group.bench_with_input(BenchmarkId::new("projudi", "case"), &projudi, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("pje_tjba", "case"), &pje_tjba, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("pje_trt5", "timeline"), &pje_trt5, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.finish();
}

fn bench_locate(c: &mut Criterion) {
    let html = std::fs::read_to_string("../../tests/fixtures/projudi/case.html").unwrap();
    let doc = Document::parse(&html).unwrap();
    let details = doc.select_first("#Partes > table > tbody").unwrap().unwrap();

    let mut group = c.benchmark_group("locate");

    group.bench_function("fast_guess", |b| {
        b.iter(|| locate_value(&details, black_box("tr:nth-child(15) > td:first-child"), "tr td", "valor da causa"))
    });

    group.bench_function("scan", |b| {
        b.iter(|| locate_value(&details, black_box("tr:nth-child(2) > td:first-child"), "tr td", "valor da causa"))
    });

    group.finish();
}

fn bench_text(c: &mut Criterion) {
    let html = std::fs::read_to_string("../../tests/fixtures/pje_tjba/document.html").unwrap();
    let replaces = [Replace::line_breaks()];

    c.bench_function("document_text", |b| {
        b.iter(|| html_to_text(&strip_script_tags(black_box(&html)), &replaces))
    });
}

fn bench_full_extraction(c: &mut Criterion) {
    let html = std::fs::read_to_string("../../tests/fixtures/projudi/case.html").unwrap();
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    let adapter = ProjudiTjba::offline();
    let config = ScrapeConfig::builder().fetch_documents(false).build();

    c.bench_function("projudi_case", |b| {
        b.iter(|| {
            let page = ScriptedPage::new(PROJUDI_URL, black_box(html.as_str()));
            runtime.block_on(try_fetch_case_info(&adapter, &page, &config, &CancelToken::new()))
        })
    });
}

criterion_group!(benches, bench_parse, bench_locate, bench_text, bench_full_extraction);
criterion_main!(benches);
