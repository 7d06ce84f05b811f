#[tokio::main]
async fn main() -> std::io::Result<()> {
    tank_party_server::run_with_config().await
}
