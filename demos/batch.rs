use resilient_api_client::{ApiClient, BatchRequest};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = ApiClient::from_env().map_err(anyhow::Error::msg)?;

    let results = client
        .batch([
            BatchRequest::get("/metrics/dashboard"),
            BatchRequest::get("/metrics/traffic").with_data(json!({"period": "30d"})),
            BatchRequest::post("/content/", json!({"title": "Draft"})),
        ])
        .await;

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(result) if result.success => {
                println!("#{index}: ok after {} attempt(s)", result.attempts);
            }
            Ok(result) => eprintln!(
                "#{index}: failed with status {}: {}",
                result.status,
                result.error.unwrap_or_default()
            ),
            Err(err) => eprintln!("#{index}: could not build request: {err}"),
        }
    }

    Ok(())
}
