mod support;

#[tokio::test]
async fn test_party_creation() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base_url}/parties"))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("json body");
    let code = body["code"].as_str().expect("code field");
    assert_eq!(code.len(), 6);
}

#[tokio::test]
async fn test_party_codes_are_distinct() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let mut codes = Vec::new();
    for _ in 0..3 {
        let res = client
            .post(format!("{base_url}/parties"))
            .send()
            .await
            .expect("request should succeed");
        let body: serde_json::Value = res.json().await.expect("json body");
        codes.push(body["code"].as_str().expect("code field").to_string());
    }

    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 3);
}
