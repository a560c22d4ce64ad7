#[tokio::main]
async fn main() -> anyhow::Result<()> {
    flatwatch_lib::run().await
}
