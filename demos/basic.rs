use resilient_api_client::{ApiClient, ClientOptions, MetricsApi};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = ApiClient::from_env()
        .map_err(anyhow::Error::msg)?
        .with_options(ClientOptions {
            max_retries: 2,
            ..ClientOptions::default()
        });
    let metrics = MetricsApi::new(&client);

    let dashboard = metrics.dashboard_data().await?;
    if let Some(warning) = &dashboard.rate_limit_warning {
        eprintln!("rate limit warning: {} requests remaining", warning.remaining);
    }

    match dashboard.into_result() {
        Ok(data) => println!("dashboard: {data}"),
        Err(err) => eprintln!("failed to fetch dashboard data: {err}"),
    }

    let traffic = metrics.traffic_data(Some("7d")).await?;
    println!("traffic (status {}): {:?}", traffic.status, traffic.data);

    Ok(())
}
