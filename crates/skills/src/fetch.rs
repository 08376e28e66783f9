use anyhow::{Context, bail};

pub const USER_AGENT: &str = "skillbox";

/// Fetch a URL as text. Non-2xx responses are errors; no retries.
pub async fn fetch_text(url: &str) -> anyhow::Result<String> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await
        .with_context(|| format!("failed to fetch {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("failed to fetch {url}: HTTP {status}");
    }
    Ok(response.text().await?)
}

/// Fetch a URL and parse the body as JSON.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(url: &str) -> anyhow::Result<T> {
    let body = fetch_text(url).await?;
    serde_json::from_str(&body).with_context(|| format!("invalid JSON from {url}"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/SKILL.md")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_body("---\nname: a\n---\nbody\n")
            .create_async()
            .await;

        let body = fetch_text(&format!("{}/SKILL.md", server.url())).await.unwrap();
        assert!(body.contains("name: a"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let err = fetch_text(&format!("{}/missing", server.url())).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn fetch_json_parses_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data")
            .with_status(200)
            .with_body(r#"{"tree": []}"#)
            .create_async()
            .await;

        let value: serde_json::Value =
            fetch_json(&format!("{}/data", server.url())).await.unwrap();
        assert!(value["tree"].as_array().unwrap().is_empty());
    }
}
