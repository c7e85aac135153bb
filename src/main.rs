#[tokio::main]
async fn main() {
    carelink::run().await;
}
