use criterion::{black_box, criterion_group, criterion_main, Criterion};
use page_localizer::css::find_url_tokens;
use page_localizer::dom::{parse_html, serialize_html};
use page_localizer::srcset::largest_candidate;
use page_localizer::url_resolver::{local_path, resolve};
use page_localizer::FileManager;
use tempfile::tempdir;
use url::Url;

fn bench_html_round_trip(c: &mut Criterion) {
    let html_content = r#"
        <html>
            <head>
                <link rel="stylesheet" href="/style.css">
                <script src="/script.js"></script>
                <link rel="icon" href="/favicon.ico">
            </head>
            <body>
                <img src="/logo.png" srcset="/logo.png 1x, /logo@2x.png 2x" alt="Logo">
                <a href="/banner.jpg"><img src="/banner.jpg" alt="Banner"></a>
                <div style="background: url(/hero.jpg)">About</div>
            </body>
        </html>
    "#;

    c.bench_function("parse_and_serialize_html", |b| {
        b.iter(|| {
            let dom = parse_html(black_box(html_content.as_bytes()));
            let _html = serialize_html(&dom).unwrap();
        });
    });
}

fn bench_local_paths(c: &mut Criterion) {
    let urls: Vec<Url> = [
        "https://example.com/images/photo.jpg",
        "https://example.com/blog/",
        "http://example.com:8080/assets/logo.png",
        "https://cdn.example.com/style.css?v=3&theme=dark",
        "https://example.com/path/with/many/segments/file.css#fragment",
    ]
    .iter()
    .map(|url| Url::parse(url).unwrap())
    .collect();

    c.bench_function("local_paths", |b| {
        b.iter(|| {
            for url in &urls {
                let _path = local_path(black_box(url)).unwrap();
            }
        });
    });
}

fn bench_url_resolution(c: &mut Criterion) {
    let base = Url::parse("https://example.com/subdir/page.html").unwrap();
    let candidates = [
        "../style.css",
        "./script.js",
        "images/photo.jpg",
        "https://cdn.example.com/style.css",
        "//cdn.example.com/script.js",
        "../../../assets/logo.png",
    ];

    c.bench_function("resolve_urls", |b| {
        b.iter(|| {
            for candidate in &candidates {
                let _resolved = resolve(Some(&base), black_box(candidate)).unwrap();
            }
        });
    });
}

fn bench_css_url_tokens(c: &mut Criterion) {
    let css_content = r#"
        /* url(/commented-out.png) */
        .bg1 { background-image: url('/images/bg1.jpg'); }
        .bg2 { background: url("/images/bg2.jpg") no-repeat; }
        .bg3 { background-image: url(/images/bg3.jpg); }
        .bg4 { content: "url(/not-a-reference.png)"; }
        .bg5 { background: url(data:image/gif;base64,R0lGODlhAQABAAAAACw=); }
        @font-face { src: url(fonts/a.woff2) format("woff2"), url(fonts/a.woff) format("woff"); }
        .bg6 { background-color: red; }
    "#;

    c.bench_function("find_css_url_tokens", |b| {
        b.iter(|| {
            let _tokens = find_url_tokens(black_box(css_content));
        });
    });
}

fn bench_srcset_selection(c: &mut Criterion) {
    let srcset = "photo-320.jpg 320w, photo-640.jpg 640w, photo-1024.jpg 1024w, \
                  photo-1280.jpg 1280w, photo-1920.jpg 1920w, photo-2560.jpg 2560w";

    c.bench_function("largest_srcset_candidate", |b| {
        b.iter(|| {
            let _chosen = largest_candidate(black_box(srcset));
        });
    });
}

fn bench_file_saving(c: &mut Criterion) {
    let temp_dir = tempdir().unwrap();
    let file_manager = FileManager::new(temp_dir.path()).unwrap();
    let files = [
        ("example.com/file1.png", &b"Content 1"[..]),
        ("example.com/nested/path/file2.css", &b"body { color: red; }"[..]),
        ("cdn.example.com:8080/index.html", &b"<html></html>"[..]),
    ];

    c.bench_function("save_asset_files", |b| {
        b.iter(|| {
            for (path, content) in &files {
                let _saved = file_manager.save_file(black_box(path), black_box(content));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_html_round_trip,
    bench_local_paths,
    bench_url_resolution,
    bench_css_url_tokens,
    bench_srcset_selection,
    bench_file_saving,
);
criterion_main!(benches);
