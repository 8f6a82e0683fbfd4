// document-synthesis-service/tests/generation.rs

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};

use document_synthesis::assets::AssetLoader;
use document_synthesis::charts::DefaultChartRenderer;
use document_synthesis::renderers::{DrawOp, LayoutDocument};
use document_synthesis::{Config, DocumentError, DocumentRequest, DocumentService, Result};

/// Offline loader: every logo and QR fetch fails.
struct OfflineLoader;

#[async_trait]
impl AssetLoader for OfflineLoader {
    async fn load(&self, location: &str) -> Result<Vec<u8>> {
        Err(DocumentError::GenerationFailed(format!("offline: {location}")))
    }
}

fn service() -> DocumentService {
    let config = Config::defaults().unwrap();
    let renderer = Arc::new(DefaultChartRenderer::new(600));
    DocumentService::with_backends(config, Arc::new(OfflineLoader), renderer)
}

fn study() -> Value {
    json!({
        "projectName": "Campinas Plant",
        "country": "Brazil",
        "currency": "USD",
        "dailyCapacity": 85,
        "operatingDays": 300,
        "utilizationRate": 85,
        "capex": {
            "equipment": 2800000,
            "installation": 350000,
            "infrastructure": 600000,
            "workingCapital": 250000
        },
        "opex": {
            "labor": 55000,
            "energy": 38000,
            "maintenance": 18000,
            "logistics": 22000,
            "admin": 12000,
            "other": 5000
        },
        "materials": {
            "rubber": { "yieldPct": 74.7, "pricePerTon": 240 },
            "steel": { "yieldPct": 15.0, "pricePerTon": 180 },
            "textile": { "yieldPct": 10.3, "pricePerTon": 20 }
        },
        "variableCostPct": 5,
        "governmentRoyaltyPct": 3,
        "environmentalBonusPerTon": 15
    })
}

fn feasibility_request(language: &str) -> DocumentRequest {
    serde_json::from_value(json!({
        "kind": "feasibility_study",
        "language": language,
        "subject": "Acme Tires",
        "data": study(),
        "analysis": "## Market\n\nDemand for **granulate** is growing.\n\n| Buyer | Volume |\n|---|---|\n| Sports fields | 40% |",
        "options": {
            "watermark": "confidential",
            "includeSignature": true,
            "qrTargetUrl": "https://partners.example/form",
            "date": "2026-10-19",
            "dueDiligence": { "technical": "Shredder line sized for 3.5 t/h." }
        },
        "formats": ["layout", "pdf"]
    }))
    .unwrap()
}

fn layout_of(documents: &[document_synthesis::GeneratedDocument]) -> LayoutDocument {
    let layout = documents
        .iter()
        .find(|d| d.filename.ends_with(".layout.json"))
        .unwrap();
    let bytes = general_purpose::STANDARD.decode(&layout.content_base64).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn feasibility_study_renders_both_formats() {
    let documents = service().generate_document(&feasibility_request("en")).await.unwrap();
    assert_eq!(documents.len(), 2);

    let pdf = &documents[1];
    assert_eq!(pdf.filename, "acme-tires_feasibility-study_2026-10-19.pdf");
    let bytes = general_purpose::STANDARD.decode(&pdf.content_base64).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(pdf.size_bytes, bytes.len());
    assert_eq!(pdf.page_count, documents[0].page_count);
    assert!(pdf.page_count >= 5);

    let layout = layout_of(&documents);
    let total = layout.pages.len();
    for (i, page) in layout.pages.iter().enumerate() {
        let label = format!("Page {} of {}", i + 1, total);
        assert!(page.texts().any(|t| t == label), "missing page label on page {}", i + 1);
        assert!(page.texts().any(|t| t == "CONFIDENTIAL"));
    }
}

#[tokio::test]
async fn identical_requests_give_identical_layouts() {
    let service = service();
    let first = service.generate_document(&feasibility_request("pt")).await.unwrap();
    let second = service.generate_document(&feasibility_request("pt")).await.unwrap();
    assert_eq!(first[0].page_count, second[0].page_count);
    assert_eq!(first[0].sha256, second[0].sha256);

    let a = service.outline(&feasibility_request("pt")).await.unwrap();
    let b = service.outline(&feasibility_request("pt")).await.unwrap();
    assert_eq!(a.sections, b.sections);
    assert_eq!(a.page_count, b.page_count);
}

#[tokio::test]
async fn no_block_crosses_the_bottom_margin() {
    let service = service();
    let bottom = service.config().page_geometry().content_bottom();
    for language in ["en", "pt", "es", "it", "zh"] {
        let outline = service.outline(&feasibility_request(language)).await.unwrap();
        assert!(!outline.placements.is_empty());
        for placement in &outline.placements {
            assert!(
                placement.y + placement.height <= bottom + 1e-6,
                "{language}: block at {} + {} on page {} crosses {bottom}",
                placement.y,
                placement.height,
                placement.page
            );
        }
    }
}

#[tokio::test]
async fn unknown_language_falls_back_to_english() {
    let service = service();
    let fallback = service.outline(&feasibility_request("xx")).await.unwrap();
    let english = service.outline(&feasibility_request("en")).await.unwrap();
    assert_eq!(fallback.sections, english.sections);
    assert_eq!(fallback.sections[1], "Executive Summary");
}

#[tokio::test]
async fn chart_without_source_leaves_a_placeholder() {
    let mut request = feasibility_request("en");
    request.charts = serde_json::from_value(json!([
        { "id": "cash_flow", "caption": "Cumulative cash flow", "source": null }
    ]))
    .unwrap();
    request.formats = vec![document_synthesis::DocumentFormat::Layout];

    let documents = service().generate_document(&request).await.unwrap();
    let layout = layout_of(&documents);

    let placeholders: Vec<&str> = layout
        .pages
        .iter()
        .flat_map(|p| p.texts())
        .filter(|t| t.starts_with("Chart unavailable"))
        .collect();
    assert_eq!(placeholders.len(), 1);
    assert!(placeholders[0].contains("Cumulative cash flow"));

    let images = layout
        .pages
        .iter()
        .flat_map(|p| p.ops.iter())
        .filter(|op| matches!(op, DrawOp::Image { .. }))
        .count();
    assert_eq!(images, 2);
}

#[tokio::test]
async fn invalid_study_is_an_error_envelope() {
    let mut body = serde_json::to_value(feasibility_request("en")).unwrap();
    body["data"]["dailyCapacity"] = json!(-5);
    let response = service().handle_request(body.to_string().as_bytes()).await;
    assert_eq!(response.status, "error");
    assert_eq!(response.error_type.as_deref(), Some("invalid_study_input"));
    assert!(response.documents.is_empty());
}

fn inflated_content_streams(pdf: &[u8]) -> Vec<Vec<u8>> {
    let find = |haystack: &[u8], needle: &[u8]| haystack.windows(needle.len()).position(|w| w == needle);
    let mut streams = Vec::new();
    let mut rest = pdf;
    while let Some(start) = find(rest, b"stream\n") {
        let body = &rest[start + 7..];
        let Some(end) = find(body, b"\nendstream") else { break };
        if let Ok(inflated) = miniz_oxide::inflate::decompress_to_vec_zlib(&body[..end]) {
            if find(&inflated, b"BT").is_some() {
                streams.push(inflated);
            }
        }
        rest = &body[end + 10..];
    }
    streams
}

#[tokio::test]
async fn chinese_pdf_keeps_every_character() {
    let request: DocumentRequest = serde_json::from_value(json!({
        "kind": "professional_document",
        "language": "zh",
        "subject": "轮胎回收合作协议",
        "data": { "sections": [{ "heading": "合作范围", "body": "每月交付橡胶颗粒，规格 10-30 目。" }] },
        "options": { "watermark": "draft", "date": "2026-10-19" },
        "formats": ["pdf"]
    }))
    .unwrap();
    let documents = service().generate_document(&request).await.unwrap();
    let bytes = general_purpose::STANDARD.decode(&documents[0].content_base64).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/Type0"));

    let streams = inflated_content_streams(&bytes);
    assert_eq!(streams.len(), documents[0].page_count);
    for content in &streams {
        assert!(content.windows(4).any(|w| w == b"/F4 "));
        assert!(!content.windows(2).any(|w| w == b"??"), "{}", String::from_utf8_lossy(content));
    }
}
