use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use placement_core::EngineConfig;
use placement_server::{build_app, ServerOptions};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const DATA: &str = "\
Company,Role,Compensation: CTC,Stiepend (per month),Placement Origin,Class,Gender
Google,SWE,20 LPA,,On campus,MCA,F
Infosys,Analyst,5-7 LPA,15000,Off campus,MSc Data Science,M
,,,,,MCA,M
";

fn write_tiny_dataset(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("placements.csv");
    fs::write(&path, DATA).unwrap();
    path
}

fn app(dir: &Path, admin_token: Option<&str>) -> Router {
    build_app(ServerOptions {
        data: write_tiny_dataset(dir),
        engine: EngineConfig::default(),
        llm: None,
        admin_token: admin_token.map(str::to_string),
    })
    .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn stats_reports_the_dataset() {
    let dir = tempdir().unwrap();
    let (status, json) = get(app(dir.path(), None), "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_placements"], 3);
    assert_eq!(json["companies_count"], 3);
    assert_eq!(json["compensation"]["average"], 13.0);
    assert_eq!(json["compensation"]["count"], 2);
    assert_eq!(json["placement_types"][0]["type"], "On campus");
}

#[tokio::test]
async fn search_returns_best_row_with_highlight() {
    let dir = tempdir().unwrap();
    let (status, json) = get(app(dir.path(), None), "/search?q=Infosys%20Analyst").await;
    assert_eq!(status, StatusCode::OK);
    let result = &json["result"];
    assert_eq!(result["row_index"], 1);
    assert_eq!(result["row"]["Company"], "Infosys");
    assert!(result["highlighted"].as_str().unwrap().contains("<em>Infosys</em>"));
    assert_eq!(json["answered"], true);
}

#[tokio::test]
async fn search_without_overlap_is_empty() {
    let dir = tempdir().unwrap();
    let (status, json) = get(app(dir.path(), None), "/search?q=zebra").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["result"].is_null());
    assert_eq!(json["answered"], false);
}

#[tokio::test]
async fn program_stats_and_missing_program() {
    let dir = tempdir().unwrap();
    let (status, json) = get(app(dir.path(), None), "/stats/program/mca").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_students"], 2);
    assert_eq!(json["average_salary"], 20.0);

    let (status, json) = get(app(dir.path(), None), "/stats/program/btech").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "no data");
}

#[tokio::test]
async fn company_and_role_search_respect_k() {
    let dir = tempdir().unwrap();
    let (_, json) = get(app(dir.path(), None), "/companies?q=oo").await;
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["Role"], "SWE");

    let (_, json) = get(app(dir.path(), None), "/roles?q=&k=2").await;
    assert_eq!(json["total_hits"], 3);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn analyze_without_model_is_unavailable() {
    let dir = tempdir().unwrap();
    let req = Request::post("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"question":"How many placed?"}"#))
        .unwrap();
    let (status, _) = send(app(dir.path(), None), req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn reload_requires_admin_token() {
    let dir = tempdir().unwrap();
    let router = app(dir.path(), Some("secret"));

    let denied = Request::post("/dataset/reload").body(Body::empty()).unwrap();
    let (status, _) = send(router.clone(), denied).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    fs::write(dir.path().join("placements.csv"), format!("{DATA}Amazon,SDE,30 LPA,,On campus,MCA,F\n")).unwrap();
    let allowed = Request::post("/dataset/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, _) = send(router.clone(), allowed).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = get(router, "/stats").await;
    assert_eq!(json["total_placements"], 4);
}

#[tokio::test]
async fn summary_is_plain_text() {
    let dir = tempdir().unwrap();
    let (status, body) = send(app(dir.path(), None), Request::get("/summary").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("GENDER DISTRIBUTION:"));
    assert!(text.contains("- M: 2 students (66.7%)"));
}
