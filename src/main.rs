#[tokio::main]
async fn main() -> anyhow::Result<()> {
    studentlink::bootstrapper::run().await
}
