//! End-to-end tests for the request pipeline: scope resolution,
//! authentication, the guard's decision table, quota refusals and the
//! plan catalog, all through real HTTP round trips.

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use consentry_access::{Caller, Role};
use consentry_api::auth::create_token;
use consentry_api::{build_router, build_state, ApiConfig, ApiState};
use serde_json::{json, Value};
use uuid::Uuid;

fn slug_header() -> HeaderName {
    HeaderName::from_static("x-tenant-slug")
}

fn slug_value(slug: &str) -> HeaderValue {
    HeaderValue::from_str(slug).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

async fn server() -> (TestServer, Arc<ApiState>) {
    let state = build_state(ApiConfig::default()).await.unwrap();
    let server = TestServer::new(build_router(state.clone())).unwrap();
    (server, state)
}

fn admin_token(state: &ApiState) -> String {
    let caller = Caller::super_admin(Uuid::new_v4());
    create_token(&caller, &state.config.jwt_secret, 1).unwrap()
}

fn staff_token(state: &ApiState, tenant: &Value, role: Role) -> String {
    let id: Uuid = serde_json::from_value(tenant["id"].clone()).unwrap();
    let slug = tenant["slug"].as_str().unwrap();
    let caller = Caller::tenant_user(Uuid::new_v4(), id, slug, role);
    create_token(&caller, &state.config.jwt_secret, 1).unwrap()
}

async fn provision(server: &TestServer, state: &ApiState, name: &str, slug: &str) -> Value {
    let admin = admin_token(state);
    let res = server
        .post("/api/v1/tenants")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": name, "slug": slug }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED, "{}", res.text());
    res.json::<Value>()["data"].clone()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

#[tokio::test]
async fn test_health_is_public() {
    let (server, _) = server().await;
    let res = server.get("/health").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let (server, _) = server().await;
    let res = server.get("/api-docs/openapi.json").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["info"]["title"], "Consentry API");
}

#[tokio::test]
async fn test_plan_catalog_is_public() {
    let (server, _) = server().await;
    let res = server.get("/api/v1/plans").await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let body = res.json::<Value>();
    assert_eq!(body["success"], true);
    assert!(body["data"]["version"].as_u64().unwrap() >= 1);
    let plans = body["data"]["plans"].as_array().unwrap();
    assert!(plans.iter().any(|p| p["id"] == "free"));

    let res = server.get("/api/v1/plans/free").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["limits"]["branches"], 1);
}

#[tokio::test]
async fn test_scoped_routes_require_authentication() {
    let (server, _) = server().await;

    let res = server
        .get("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&res.json()), "authRequired");

    let res = server
        .get("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer("not-a-jwt"))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&res.json()), "invalidToken");
}

#[tokio::test]
async fn test_tenant_user_must_use_own_subdomain() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);

    // No tenant header: the request lands on the base surface.
    let res = server
        .get("/api/v1/branches")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    let body = res.json::<Value>();
    assert_eq!(error_code(&body), "mustUseOwnSubdomain");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("clinic.localhost"));
}

#[tokio::test]
async fn test_super_admin_must_use_admin_domain() {
    let (server, state) = server().await;
    provision(&server, &state, "Clinic", "clinic").await;
    let admin = admin_token(&state);

    let res = server
        .get("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&res.json()), "superAdminMustUseAdminDomain");
}

#[tokio::test]
async fn test_cross_tenant_requests_refused() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;
    provision(&server, &state, "Rival", "rival").await;
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);

    let res = server
        .get("/api/v1/branches")
        .add_header(slug_header(), slug_value("rival"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&res.json()), "wrongTenant");
}

#[tokio::test]
async fn test_suspension_takes_effect_immediately() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);
    let admin = admin_token(&state);
    let id = clinic["id"].as_str().unwrap();

    let res = server
        .get("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = server
        .post(&format!("/api/v1/tenants/{id}/suspend"))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["status"], "suspended");

    // No cached status to wait out: the very next request is refused.
    let res = server
        .get("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&res.json()), "suspended");

    let res = server
        .post(&format!("/api/v1/tenants/{id}/activate"))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = server
        .get("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_quota_refusal_carries_code_and_counts() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);
    let admin = admin_token(&state);
    let id = clinic["id"].as_str().unwrap();

    let res = server
        .put(&format!("/api/v1/tenants/{id}/limits"))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "branches": 5 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["limits"]["branches"], 5);

    for i in 0..5 {
        let res = server
            .post("/api/v1/branches")
            .add_header(slug_header(), slug_value("clinic"))
            .add_header(header::AUTHORIZATION, bearer(&staff))
            .json(&json!({ "name": format!("Branch {i}") }))
            .await;
        assert_eq!(res.status_code(), StatusCode::CREATED, "{}", res.text());
    }

    let res = server
        .post("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "name": "One too many" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let body = res.json::<Value>();
    assert_eq!(error_code(&body), "RESOURCE_LIMIT_REACHED");
    assert!(body["error"]["message"].as_str().unwrap().contains("(5/5)"));
    assert_eq!(body["error"]["details"]["resourceType"], "branches");
    assert_eq!(body["error"]["details"]["current"], 5);
    assert_eq!(body["error"]["details"]["max"], 5);
}

#[tokio::test]
async fn test_usage_report_shape() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);

    for i in 0..4 {
        let res = server
            .post("/api/v1/consents")
            .add_header(slug_header(), slug_value("clinic"))
            .add_header(header::AUTHORIZATION, bearer(&staff))
            .json(&json!({ "name": format!("Consent {i}") }))
            .await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
    }

    let res = server
        .get("/api/v1/usage")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let data = res.json::<Value>()["data"].clone();
    assert_eq!(data["plan"]["id"], "free");
    assert_eq!(data["plan"]["status"], "trial");

    let resources = data["resources"].as_array().unwrap();
    let consents = resources
        .iter()
        .find(|r| r["resourceType"] == "consents")
        .unwrap();
    assert_eq!(consents["current"], 4);
    assert_eq!(consents["max"], 20);
    assert_eq!(consents["percentage"], 20);
    assert_eq!(consents["level"], "ok");

    // Storage is derived: one megabyte per two live consents.
    let storage = resources
        .iter()
        .find(|r| r["resourceType"] == "storageMb")
        .unwrap();
    assert_eq!(storage["current"], 2);

    // The free plan allows one branch, so zero used is already 0%.
    let branches = resources
        .iter()
        .find(|r| r["resourceType"] == "branches")
        .unwrap();
    assert_eq!(branches["current"], 0);
    assert_eq!(branches["max"], 1);
}

#[tokio::test]
async fn test_blocked_level_reported_at_ceiling() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);

    let res = server
        .post("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "name": "Only branch" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let res = server
        .get("/api/v1/usage")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    let data = res.json::<Value>()["data"].clone();
    let branches = data["resources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["resourceType"] == "branches")
        .cloned()
        .unwrap();
    assert_eq!(branches["level"], "blocked");
    assert_eq!(branches["percentage"], 100);

    assert!(data["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["resource"] == "branches" && a["message"].as_str().unwrap().contains("(1/1)")));
}

#[tokio::test]
async fn test_soft_delete_frees_quota() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);

    let res = server
        .post("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "name": "First" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let id = res.json::<Value>()["data"]["id"].as_str().unwrap().to_owned();

    // Free plan allows one branch.
    let res = server
        .post("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "name": "Second" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .delete(&format!("/api/v1/branches/{id}"))
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = server
        .post("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "name": "Second" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED, "{}", res.text());
}

#[tokio::test]
async fn test_plan_edits_are_not_retroactive() {
    let (server, state) = server().await;
    let before = provision(&server, &state, "Before", "before").await;
    let admin = admin_token(&state);

    let version = server.get("/api/v1/plans").await.json::<Value>()["data"]["version"]
        .as_u64()
        .unwrap();
    let res = server
        .put("/api/v1/plans/free")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "expectedVersion": version, "limits": { "branches": 99 } }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK, "{}", res.text());
    assert_eq!(res.json::<Value>()["data"]["limits"]["branches"], 99);

    // The tenant provisioned before the edit keeps its copied ceiling.
    let id = before["id"].as_str().unwrap();
    let res = server
        .get(&format!("/api/v1/tenants/{id}"))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(res.json::<Value>()["data"]["limits"]["branches"], 1);

    // A tenant provisioned after the edit copies the new value.
    let after = provision(&server, &state, "After", "after").await;
    assert_eq!(after["limits"]["branches"], 99);
}

#[tokio::test]
async fn test_stale_catalog_edit_conflicts() {
    let (server, state) = server().await;
    let admin = admin_token(&state);

    let version = server.get("/api/v1/plans").await.json::<Value>()["data"]["version"]
        .as_u64()
        .unwrap();
    let res = server
        .put("/api/v1/plans/free")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "expectedVersion": version, "priceMonthly": 1000 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    // Same expected version again: someone else got there first.
    let res = server
        .put("/api/v1/plans/free")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "expectedVersion": version, "priceMonthly": 2000 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_code(&res.json()), "versionConflict");
}

#[tokio::test]
async fn test_missing_permission_refused() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;

    // Front-desk operators cannot create branches.
    let operator = staff_token(&state, &clinic, Role::Operator);
    let res = server
        .post("/api/v1/branches")
        .add_header(slug_header(), slug_value("clinic"))
        .add_header(header::AUTHORIZATION, bearer(&operator))
        .json(&json!({ "name": "North" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    let body = res.json::<Value>();
    assert_eq!(error_code(&body), "missingPermission");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("create_branches"));
}

#[tokio::test]
async fn test_admin_surface_closed_to_tenant_staff() {
    let (server, state) = server().await;
    let clinic = provision(&server, &state, "Clinic", "clinic").await;

    // A general admin runs their whole tenant but holds no platform
    // permissions, so the tenant list is out of reach.
    let staff = staff_token(&state, &clinic, Role::GeneralAdmin);
    let res = server
        .get("/api/v1/tenants")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&res.json()), "missingPermission");
}

#[tokio::test]
async fn test_undeclared_route_fails_closed() {
    let (server, state) = server().await;
    let admin = admin_token(&state);

    let res = server
        .get("/api/v1/does-not-exist")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&res.json()), "missingPermission");
}

#[tokio::test]
async fn test_provisioning_conflicts_and_bad_slugs() {
    let (server, state) = server().await;
    let admin = admin_token(&state);
    provision(&server, &state, "Clinic", "clinic").await;

    let res = server
        .post("/api/v1/tenants")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "Clinic Two", "slug": "clinic" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_code(&res.json()), "slugInUse");

    let res = server
        .post("/api/v1/tenants")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "!!!" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&res.json()), "invalidSlug");
}

#[tokio::test]
async fn test_global_stats_need_their_own_permission() {
    let (server, state) = server().await;
    provision(&server, &state, "Clinic", "clinic").await;
    let admin = admin_token(&state);

    let res = server
        .get("/api/v1/tenants/stats/global")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let data = res.json::<Value>()["data"].clone();
    assert_eq!(data["totalTenants"], 1);
    assert_eq!(data["byStatus"]["trial"], 1);
}
