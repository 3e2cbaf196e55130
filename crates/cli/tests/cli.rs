// ABOUTME: Integration tests for the brinfo CLI binary.
// ABOUTME: Serves pages from a mock server and checks the printed JSON and exit codes.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const ARTICLE: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<title>Ministério amplia vacinação - Ministério da Saúde</title>
<meta property="og:title" content="Ministério amplia vacinação">
<meta property="og:description" content="Campanha passa a incluir novos grupos prioritários em todo o país.">
<meta property="og:image" content="/imagens/vacina.jpg">
<meta property="article:published_time" content="2020-06-21T15:53:10-03:00">
</head>
<body>
<div id="content-core">
<p>Campanha passa a incluir novos grupos prioritários em todo o país.</p>
<p>A ampliação vale a partir desta segunda-feira em todos os postos.</p>
<span class="categoria">Saúde</span>
</div>
</body>
</html>"#;

const LISTING: &str = r#"<html><body><ul>
<li class="item"><a href="/saude/noticia-1">Um</a><span class="data">21/06/2020 10h30</span></li>
<li class="item"><a href="/saude/noticia-2">Dois</a><span class="data">22/06/2020 11h00</span></li>
</ul></body></html>"#;

fn brinfo() -> Command {
    let mut cmd = Command::cargo_bin("brinfo").unwrap();
    cmd.env_remove("BRINFO_SOURCES")
        .env_remove("BRINFO_CACHE_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn article_prints_record_with_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/noticia");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(ARTICLE);
    });

    let output = brinfo()
        .arg("article")
        .arg(server.url("/noticia"))
        .arg("--source-guid")
        .arg("gov-saude")
        .arg("--custom-extractors")
        .arg(r#"{"body": {"category": ".categoria|text"}}"#)
        .arg("--extra-data")
        .arg(r#"{"orgao": "ms"}"#)
        .output()
        .unwrap();
    mock.assert();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["title"], "Ministério amplia vacinação");
    assert_eq!(json["source_guid"], "gov-saude");
    assert_eq!(json["extra"]["orgao"], "ms");
    assert_eq!(json["brinfo"]["category"], "Saúde");
    let key = json["key"].as_str().unwrap();
    assert!(key.starts_with("gov-saude/article-"));
    assert!(key.ends_with(".json"));
}

#[test]
fn article_invalid_for_ingestion_fails_after_printing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/vazio");
        then.status(200)
            .header("content-type", "text/html")
            .body("<html><body><p>x</p></body></html>");
    });

    brinfo()
        .arg("article")
        .arg(server.url("/vazio"))
        .arg("-s")
        .arg("gov-saude")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"source_guid\": \"gov-saude\""))
        .stderr(predicate::str::contains("missing title"));
}

#[test]
fn article_http_error_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/404");
        then.status(404);
    });

    brinfo()
        .arg("article")
        .arg(server.url("/404"))
        .arg("-s")
        .arg("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("404"));
}

#[test]
fn article_uses_cache_dir() {
    let cache = TempDir::new().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/noticia");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(ARTICLE);
    });

    for _ in 0..2 {
        brinfo()
            .arg("--use-cache")
            .arg("--cache-dir")
            .arg(cache.path())
            .arg("article")
            .arg(server.url("/noticia"))
            .arg("-s")
            .arg("gov-saude")
            .assert()
            .success();
    }
    mock.assert_hits(1);
}

#[test]
fn inspect_file_runs_pipeline_on_local_html() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noticia.html");
    fs::write(&path, ARTICLE).unwrap();

    brinfo()
        .arg("inspect-file")
        .arg(&path)
        .arg("https://www.gov.br/saude/noticia")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ministério amplia vacinação"))
        .stdout(predicate::str::contains("https://www.gov.br/imagens/vacina.jpg"));
}

#[test]
fn inspect_file_uses_sources_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noticia.html");
    fs::write(&path, ARTICLE).unwrap();
    let sources = dir.path().join("sources.json");
    fs::write(
        &sources,
        r#"[{"id": "saude", "host": "www.gov.br", "extractors": {"body": {"category": ".categoria|text"}}}]"#,
    )
    .unwrap();

    brinfo()
        .arg("inspect-file")
        .arg(&path)
        .arg("https://www.gov.br/saude/noticia")
        .arg("--sources")
        .arg(&sources)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"category\": \"Saúde\""));
}

#[test]
fn inspect_file_rejects_bad_custom_extractors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noticia.html");
    fs::write(&path, ARTICLE).unwrap();

    brinfo()
        .arg("inspect-file")
        .arg(&path)
        .arg("https://www.gov.br/saude/noticia")
        .arg("--custom-extractors")
        .arg(r#"{"body": {"category": ".categoria"}}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --custom-extractors"));
}

#[test]
fn listing_prints_links() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/noticias");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(LISTING);
    });

    let output = brinfo()
        .arg("listing")
        .arg(server.url("/noticias"))
        .arg("--link-container")
        .arg("li.item")
        .arg("--url-extractor")
        .arg("a|href")
        .arg("--published-at-extractor")
        .arg(".data|text::time")
        .output()
        .unwrap();
    assert!(output.status.success());

    let links: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(links.as_array().unwrap().len(), 2);
    assert_eq!(links[0]["url"], server.url("/saude/noticia-1"));
    assert!(links[1]["published_at"].is_string());
}

#[test]
fn inspect_reports_problems_without_failing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/vazio");
        then.status(200)
            .header("content-type", "text/html")
            .body("<html><body><p>x</p></body></html>");
    });

    let output = brinfo()
        .arg("inspect")
        .arg(server.url("/vazio"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["url"], server.url("/vazio"));
    let problems = json["problems"].as_array().unwrap();
    assert!(problems.iter().any(|p| p == "missing title"));
}

#[test]
fn inspect_valid_article_has_no_problems() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/noticia");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(ARTICLE);
    });

    let output = brinfo()
        .arg("inspect")
        .arg(server.url("/noticia"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["title"], "Ministério amplia vacinação");
    assert_eq!(json["problems"], serde_json::json!([]));
}

#[test]
fn listing_defaults_url_extractor_and_accepts_short_flags() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/noticias");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(LISTING);
    });

    let output = brinfo()
        .arg("listing")
        .arg(server.url("/noticias"))
        .arg("-l")
        .arg("li.item")
        .arg("-p")
        .arg(".data|text::time")
        .output()
        .unwrap();
    assert!(output.status.success());

    let links: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(links.as_array().unwrap().len(), 2);
    assert_eq!(links[1]["url"], server.url("/saude/noticia-2"));
}
