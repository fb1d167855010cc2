//! Strapi resource adapter against the mock backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use repair_desk_admin::http::ApiClient;
use repair_desk_admin::strapi::StrapiProvider;
use repair_desk_admin::{ApiError, DataProvider, SessionStore};
use repair_desk_core::{
    CreateParams, DeleteManyParams, DeleteParams, GetListParams, GetManyParams,
    GetManyReferenceParams, GetOneParams, Identifier, Pagination, Record, Sort, SortOrder,
    UpdateManyParams, UpdateParams, UserRecord,
};
use repair_desk_integration_tests::{LOCKED_ID, MockBackend, VALID_TOKEN};
use secrecy::SecretString;
use serde_json::{Value, json};

async fn setup() -> (MockBackend, StrapiProvider) {
    let backend = MockBackend::start().await;
    let session = SessionStore::in_memory();
    session.login(
        SecretString::from(VALID_TOKEN),
        UserRecord::new("1", "admin", "admin@example.com"),
    );
    let api = ApiClient::new(&backend.api_config(), session).unwrap();
    (backend, StrapiProvider::new(api))
}

fn seed_customers(backend: &MockBackend) {
    backend.seed("customers", json!({"id": 1, "documentId": "c1", "name": "สมชาย ใจดี", "phone": "0811111111"}));
    backend.seed("customers", json!({"id": 2, "documentId": "c2", "name": "Somsak", "phone": "0822222222"}));
    backend.seed("customers", json!({"id": 3, "documentId": "c3", "name": "Anna", "phone": "0833333333"}));
}

fn filter(value: Value) -> repair_desk_core::Filter {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_get_one_remaps_document_id() {
    let (backend, provider) = setup().await;
    backend.seed("customers", json!({"documentId": "5", "name": "X"}));

    let result = provider
        .get_one(
            "customers",
            &GetOneParams {
                id: Identifier::from(5),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        result.data.into_value(),
        json!({"documentId": "5", "name": "X", "id": "5"})
    );
    assert_eq!(backend.last_request().unwrap().path, "/customers/5");
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let (backend, provider) = setup().await;

    provider
        .get_list("units", &GetListParams::default())
        .await
        .unwrap();

    assert_eq!(
        backend.last_request().unwrap().authorization.as_deref(),
        Some("Bearer abc")
    );
}

#[tokio::test]
async fn test_get_list_translates_params() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let params = GetListParams {
        pagination: Some(Pagination::new(1, 2)),
        sort: Some(Sort::new("name", SortOrder::Asc)),
        filter: filter(json!({"name": "s", "phone": ""})),
    };
    let result = provider.get_list("customers", &params).await.unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.path, "/customers");
    assert_eq!(
        request.query,
        vec![
            ("pagination[page]".to_string(), "1".to_string()),
            ("pagination[pageSize]".to_string(), "2".to_string()),
            ("sort".to_string(), "name:asc".to_string()),
            ("filters[name][$containsi]".to_string(), "s".to_string()),
        ]
    );

    // "Somsak" matches case-insensitively; the Thai name does not contain "s"
    assert_eq!(result.total, 1);
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.data[0].id(), Some(Identifier::from("c2")));
}

#[tokio::test]
async fn test_get_list_pages_and_totals() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let params = GetListParams {
        pagination: Some(Pagination::new(2, 2)),
        sort: Some(Sort::new("name", SortOrder::Desc)),
        filter: filter(json!({})),
    };
    let result = provider.get_list("customers", &params).await.unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.data.len(), 1);
    assert!(result.data.iter().all(|r| r.id() == r.get("documentId").and_then(Identifier::from_json)));
    assert_eq!(
        backend.last_request().unwrap().query_values("sort"),
        vec!["name:desc"]
    );
}

#[tokio::test]
async fn test_non_string_filter_uses_eq() {
    let (backend, provider) = setup().await;
    backend.seed("units", json!({"documentId": "u1", "name": "ชิ้น", "factor": 5}));
    backend.seed("units", json!({"documentId": "u2", "name": "กล่อง", "factor": 12}));

    let params = GetListParams {
        filter: filter(json!({"factor": 5, "name": null})),
        ..GetListParams::default()
    };
    let result = provider.get_list("units", &params).await.unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.query_values("filters[factor][$eq]"), vec!["5"]);
    assert!(request.query_values("filters[name][$containsi]").is_empty());
    assert!(request.query_values("filters[name][$eq]").is_empty());
    assert_eq!(result.total, 1);
}

#[tokio::test]
async fn test_get_many_filters_by_document_ids() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let result = provider
        .get_many(
            "customers",
            &GetManyParams {
                ids: vec![Identifier::from("c1"), Identifier::from("c3")],
            },
        )
        .await
        .unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(
        request.query_values("filters[documentId][$in][]"),
        vec!["c1", "c3"]
    );
    let ids: Vec<_> = result.data.iter().filter_map(Record::id).collect();
    assert_eq!(ids, vec![Identifier::from("c1"), Identifier::from("c3")]);
}

#[tokio::test]
async fn test_get_many_reference_adds_relation_filter() {
    let (backend, provider) = setup().await;
    backend.seed("customers", json!({"documentId": "c1", "name": "A", "category": {"documentId": "cat1"}}));
    backend.seed("customers", json!({"documentId": "c2", "name": "B", "category": {"documentId": "cat2"}}));

    let params = GetManyReferenceParams {
        target: "category".to_string(),
        id: Identifier::from("cat1"),
        list: GetListParams {
            pagination: Some(Pagination::new(1, 10)),
            ..GetListParams::default()
        },
    };
    let result = provider
        .get_many_reference("customers", &params)
        .await
        .unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(
        request.query_values("filters[category][documentId][$eq]"),
        vec!["cat1"]
    );
    assert_eq!(request.query_values("pagination[pageSize]"), vec!["10"]);
    assert_eq!(result.total, 1);
    assert_eq!(result.data[0].id(), Some(Identifier::from("c1")));
}

#[tokio::test]
async fn test_create_wraps_payload() {
    let (backend, provider) = setup().await;

    let result = provider
        .create(
            "categories",
            &CreateParams {
                data: json!({"name": "มือถือ"}),
            },
        )
        .await
        .unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.body, Some(json!({"data": {"name": "มือถือ"}})));
    assert_eq!(result.data.id(), result.data.get("documentId").and_then(Identifier::from_json));
    assert_eq!(result.data.get("name"), Some(&json!("มือถือ")));
}

#[tokio::test]
async fn test_create_validation_error_carries_payload() {
    let (_backend, provider) = setup().await;

    let err = provider
        .create(
            "categories",
            &CreateParams {
                data: json!({"name": ""}),
            },
        )
        .await
        .unwrap_err();

    let ApiError::Backend { status, error } = &err else {
        panic!("expected backend error, got {err:?}");
    };
    assert_eq!(*status, 400);
    let error = error.as_ref().unwrap();
    assert_eq!(error.name.as_deref(), Some("ValidationError"));
    assert!(error.details.get("errors").is_some());
    assert_eq!(err.backend_message(), Some("name must be defined."));
}

#[tokio::test]
async fn test_update_wraps_payload_and_remaps() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let result = provider
        .update(
            "customers",
            &UpdateParams {
                id: Identifier::from("c2"),
                data: json!({"phone": "0899999999"}),
                previous_data: None,
            },
        )
        .await
        .unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.path, "/customers/c2");
    assert_eq!(request.body, Some(json!({"data": {"phone": "0899999999"}})));
    assert_eq!(result.data.id(), Some(Identifier::from("c2")));
    assert_eq!(
        backend.record("customers", "c2").unwrap()["phone"],
        json!("0899999999")
    );
}

#[tokio::test]
async fn test_update_many_returns_document_ids() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let result = provider
        .update_many(
            "customers",
            &UpdateManyParams {
                ids: vec![Identifier::from("c1"), Identifier::from("c3")],
                data: json!({"vip": true}),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        result.data,
        vec![Identifier::from("c1"), Identifier::from("c3")]
    );
    assert_eq!(backend.record("customers", "c1").unwrap()["vip"], json!(true));
    assert_eq!(backend.record("customers", "c3").unwrap()["vip"], json!(true));
    assert!(backend.record("customers", "c2").unwrap().get("vip").is_none());
}

#[tokio::test]
async fn test_update_many_fails_as_a_whole() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);
    backend.seed("customers", json!({"documentId": LOCKED_ID, "name": "Locked"}));

    let err = provider
        .update_many(
            "customers",
            &UpdateManyParams {
                ids: vec![Identifier::from("c1"), Identifier::from(LOCKED_ID)],
                data: json!({"vip": true}),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    // No rollback: the other update may already have been applied
    let puts = backend
        .requests()
        .iter()
        .filter(|r| r.method == "PUT")
        .count();
    assert!(puts >= 1);
}

#[tokio::test]
async fn test_delete_returns_deleted_record() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let result = provider
        .delete(
            "customers",
            &DeleteParams {
                id: Identifier::from("c1"),
                previous_data: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.data.id(), Some(Identifier::from("c1")));
    assert_eq!(result.data.get("name"), Some(&json!("สมชาย ใจดี")));
    assert!(backend.record("customers", "c1").is_none());
}

#[tokio::test]
async fn test_delete_without_body_falls_back() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);
    backend.delete_without_body(true);

    let previous = Record::from_value(json!({"id": 2, "documentId": "c2", "name": "Somsak"})).unwrap();
    let result = provider
        .delete(
            "customers",
            &DeleteParams {
                id: Identifier::from("c2"),
                previous_data: Some(previous),
            },
        )
        .await
        .unwrap();
    assert_eq!(result.data.id(), Some(Identifier::from("c2")));
    assert_eq!(result.data.get("name"), Some(&json!("Somsak")));

    let result = provider
        .delete(
            "customers",
            &DeleteParams {
                id: Identifier::from("c3"),
                previous_data: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        result.data.into_value(),
        json!({"id": "c3", "documentId": "c3"})
    );
}

#[tokio::test]
async fn test_delete_many_returns_requested_ids() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let ids = vec![Identifier::from("c1"), Identifier::from("c2")];
    let result = provider
        .delete_many("customers", &DeleteManyParams { ids: ids.clone() })
        .await
        .unwrap();

    assert_eq!(result.data, ids);
    assert!(backend.record("customers", "c1").is_none());
    assert!(backend.record("customers", "c2").is_none());
    assert!(backend.record("customers", "c3").is_some());
}

#[tokio::test]
async fn test_delete_many_fails_on_missing_record() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let err = provider
        .delete_many(
            "customers",
            &DeleteManyParams {
                ids: vec![Identifier::from("c1"), Identifier::from("nope")],
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_get_one_not_found() {
    let (_backend, provider) = setup().await;

    let err = provider
        .get_one(
            "units",
            &GetOneParams {
                id: Identifier::from("missing"),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.backend_message(), Some("Not Found"));
}

#[tokio::test]
async fn test_identifier_stays_one_path_segment() {
    let (backend, provider) = setup().await;
    seed_customers(&backend);

    let err = provider
        .get_one(
            "customers",
            &GetOneParams {
                id: Identifier::from("c1/../c2?x=1#frag"),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    let request = backend.last_request().unwrap();
    assert_eq!(request.path, "/customers/c1%2F..%2Fc2%3Fx=1%23frag");
    assert!(request.query.is_empty());
}
